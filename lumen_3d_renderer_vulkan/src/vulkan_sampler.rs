/// SamplerCache - internal VkSampler management for the Vulkan backend
///
/// Creates and caches one VkSampler per SamplerType on first use. Binding
/// sets reference the cached handles, so samplers live as long as the cache.

use lumen_3d_renderer::lumen3d::Result;
use lumen_3d_renderer::lumen3d::graphics_device::SamplerType;
use lumen_3d_renderer::engine_err;
use ash::vk;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Internal sampler cache, destroys every sampler on drop
pub(crate) struct SamplerCache {
    ctx: Arc<GpuContext>,
    cache: FxHashMap<SamplerType, vk::Sampler>,
}

/// Fixed-function parameters of one sampler type
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SamplerParams {
    pub(crate) filter: vk::Filter,
    pub(crate) mipmap_mode: vk::SamplerMipmapMode,
    pub(crate) address_mode: vk::SamplerAddressMode,
    pub(crate) anisotropic: bool,
}

/// Map a sampler type to its Vulkan parameters
pub(crate) fn sampler_params(sampler_type: SamplerType) -> SamplerParams {
    match sampler_type {
        SamplerType::LinearRepeat => SamplerParams {
            filter: vk::Filter::LINEAR,
            mipmap_mode: vk::SamplerMipmapMode::LINEAR,
            address_mode: vk::SamplerAddressMode::REPEAT,
            anisotropic: true,
        },
        SamplerType::LinearClamp => SamplerParams {
            filter: vk::Filter::LINEAR,
            mipmap_mode: vk::SamplerMipmapMode::LINEAR,
            address_mode: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            anisotropic: true,
        },
        SamplerType::NearestRepeat => SamplerParams {
            filter: vk::Filter::NEAREST,
            mipmap_mode: vk::SamplerMipmapMode::NEAREST,
            address_mode: vk::SamplerAddressMode::REPEAT,
            anisotropic: false,
        },
        SamplerType::NearestClamp => SamplerParams {
            filter: vk::Filter::NEAREST,
            mipmap_mode: vk::SamplerMipmapMode::NEAREST,
            address_mode: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            anisotropic: false,
        },
    }
}

impl SamplerCache {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Self {
        Self {
            ctx,
            cache: FxHashMap::default(),
        }
    }

    /// Get or create the VkSampler for the given type
    pub(crate) fn get(&mut self, sampler_type: SamplerType) -> Result<vk::Sampler> {
        if let Some(&sampler) = self.cache.get(&sampler_type) {
            return Ok(sampler);
        }

        let sampler = self.create_vk_sampler(sampler_type)?;
        self.cache.insert(sampler_type, sampler);
        Ok(sampler)
    }

    fn create_vk_sampler(&self, sampler_type: SamplerType) -> Result<vk::Sampler> {
        let params = sampler_params(sampler_type);

        let mut create_info = vk::SamplerCreateInfo::default()
            .mag_filter(params.filter)
            .min_filter(params.filter)
            .mipmap_mode(params.mipmap_mode)
            .address_mode_u(params.address_mode)
            .address_mode_v(params.address_mode)
            .address_mode_w(params.address_mode)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(vk::LOD_CLAMP_NONE)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .unnormalized_coordinates(false);

        create_info = match (params.anisotropic, self.ctx.max_anisotropy) {
            (true, Some(max_anisotropy)) => create_info
                .anisotropy_enable(true)
                .max_anisotropy(max_anisotropy.min(16.0)),
            _ => create_info
                .anisotropy_enable(false)
                .max_anisotropy(1.0),
        };

        unsafe {
            self.ctx.device.create_sampler(&create_info, None)
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to create {:?} sampler: {:?}", sampler_type, e))
        }
    }
}

impl Drop for SamplerCache {
    fn drop(&mut self) {
        for (_, sampler) in self.cache.drain() {
            unsafe { self.ctx.device.destroy_sampler(sampler, None); }
        }
    }
}
