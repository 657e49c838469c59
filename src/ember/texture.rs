use wgpu::{
    Device, Extent3d, FilterMode, ImageCopyTexture, ImageDataLayout, Origin3d, Queue, Sampler,
    SamplerDescriptor, Texture, TextureAspect, TextureDescriptor, TextureDimension, TextureFormat,
    TextureUsages, TextureView, TextureViewDescriptor,
};
use winit::dpi::PhysicalSize;

/// GPU-side presentable image the traced frame is uploaded into once per
/// completed frame. The renderer itself never touches this; it only hands
/// over its packed pixel buffer.
pub struct Image {
    pub gpu_texture: Texture,
    pub view: TextureView,
    pub sampler: Sampler,
    pub name: String,
}

impl Image {
    pub fn new(device: &Device, width: u32, height: u32, label: &str) -> Image {
        let gpu_texture = device.create_texture(&TextureDescriptor {
            label: Some(label),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8UnormSrgb,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = gpu_texture.create_view(&TextureViewDescriptor {
            label: Some(&format!("{} view", label)),
            ..Default::default()
        });

        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some(&format!("{} sampler", label)),
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            gpu_texture,
            view,
            sampler,
            name: label.to_string(),
        }
    }

    /// Uploads one frame of tightly packed RGBA8 pixels.
    pub fn write(&self, queue: &Queue, rgba: &[u8]) {
        let pixel_count = {
            let size = self.gpu_texture.size();
            size.width * size.height
        } as usize;
        assert_eq!(pixel_count, rgba.len() / 4);

        queue.write_texture(
            ImageCopyTexture {
                texture: &self.gpu_texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            rgba,
            ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.gpu_texture.width()),
                rows_per_image: Some(self.gpu_texture.height()),
            },
            self.gpu_texture.size(),
        )
    }

    pub fn resize(&mut self, device: &Device, new_size: PhysicalSize<u32>) {
        if self.gpu_texture.width() == new_size.width
            && self.gpu_texture.height() == new_size.height
        {
            return;
        }

        let new = Self::new(device, new_size.width, new_size.height, &self.name);
        self.sampler = new.sampler;
        self.view = new.view;
        self.gpu_texture = new.gpu_texture;
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.gpu_texture.width(), self.gpu_texture.height())
    }
}
