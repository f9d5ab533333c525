//! A single value stored in a uniform buffer.

use wgpu::util::DeviceExt;

/// Uniform buffer holding one `A`, along with a CPU copy of what was last uploaded.
pub struct Var<A> {
    buffer: wgpu::Buffer,
    value: A,
}

impl<A: bytemuck::Pod + bytemuck::Zeroable + PartialEq> Var<A> {
    pub fn uniform(device: &wgpu::Device, label: &str, value: A) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(&value),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Var { buffer, value }
    }

    /// Upload `value` unless it is already what the buffer holds. Returns whether a write was
    /// queued.
    pub fn set(&mut self, queue: &wgpu::Queue, value: A) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&self.value));
        true
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }
}
