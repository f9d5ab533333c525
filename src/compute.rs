use bytemuck::{Pod, Zeroable};

use crate::{screen, view::ViewParameters};

/// Workgroup size for `compute.wgsl#main`, along both `x` and `y`.
pub const WORKGROUP_SIZE: u32 = 8;

/// Corresponds to `compute.wgsl#Uniforms`.
///
/// WGSL rounds a uniform struct up to a multiple of its alignment; the trailing padding keeps
/// the Rust side the same size as the shader's view of it.
#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq)]
pub struct Uniforms {
    pub view: ViewParameters,
    pub max_iterations: u32,
    pub _padding: u32,
}

impl Uniforms {
    pub fn new(view: ViewParameters, max_iterations: u32) -> Self {
        Self {
            view,
            max_iterations,
            _padding: 0,
        }
    }
}

/**
Dispatch size for `compute.wgsl#main`

[WGSL compute shader workgroups reference](https://www.w3.org/TR/WGSL/#compute-shader-workgroups)

For a single workgroup, a compute entrypoint with `@workgroup_size(w_x, w_y, w_z)`
is run `w_x * w_y * w_z` times. A call to `dispatch_workgroups(x, y, z)` runs `x * y * z`
workgroups.

`compute.wgsl#main` uses `global_invocation_id.xy` directly as the pixel coordinate, with
`@workgroup_size(8, 8, 1)`. Covering a `width` x `height` texture takes
`(ceil(width / 8), ceil(height / 8), 1)` workgroups. When a side isn't a multiple of 8 the
last row or column of workgroups hangs over the edge of the texture; those invocations fail
the shader's bounds check and return without writing.

A 4k screen needs `480 * 270` workgroups, far below the
[maxComputeWorkgroupsPerDimension](https://www.w3.org/TR/webgpu/#dom-supported-limits-maxcomputeworkgroupsperdimension)
limit of 65535 per side.
*/
pub fn dispatch_size(size: screen::Size) -> (u32, u32, u32) {
    (
        size.width.div_ceil(WORKGROUP_SIZE),
        size.height.div_ceil(WORKGROUP_SIZE),
        1,
    )
}
