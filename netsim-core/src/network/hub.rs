//! Hubs repeat every frame out of every other port.

use bytes::Bytes;

use super::{DeviceBehavior, DeviceContext, DeviceType, InterfaceId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hub;

impl DeviceBehavior for Hub {
    fn device_type(&self) -> DeviceType {
        DeviceType::Hub
    }

    fn receive(&mut self, ctx: &mut DeviceContext<'_>, ingress: InterfaceId, data: &Bytes) {
        ctx.flood(ingress, data);
    }

    fn reset(&mut self) {}
}
