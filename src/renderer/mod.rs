pub mod atlas;
pub mod batch;
pub mod pipeline;

use std::collections::HashMap;
use std::sync::Arc;

use image::RgbaImage;
use log::info;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use atlas::Atlas;
use batch::SpriteBatch;
use pipeline::{TilePipeline, TileVertex, create_tile_pipeline, orthographic_projection};

#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter found: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}

pub struct Renderer {
    pub window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    tile_pipeline: TilePipeline,
    projection_buffer: wgpu::Buffer,
    projection_bind_group: wgpu::BindGroup,
    /// Bound for sprite quads whose image was never uploaded.
    blank_bind_group: wgpu::BindGroup,
    tileset_bind_group: Option<wgpu::BindGroup>,
    sprite_bind_groups: HashMap<&'static str, wgpu::BindGroup>,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(Arc::clone(&window))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                compatible_surface: Some(&surface),
                ..Default::default()
            })
            .await?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let format = *caps.formats.first().ok_or(GpuError::NoSurfaceFormat)?;
        let alpha_mode = caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let tile_pipeline = create_tile_pipeline(&device, format);

        let proj = orthographic_projection(config.width as f32, config.height as f32);
        let projection_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("projection_buffer"),
            contents: bytemuck::cast_slice(&proj),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let projection_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("projection_bg"),
            layout: &tile_pipeline.projection_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: projection_buffer.as_entire_binding(),
            }],
        });

        let blank_bind_group = Atlas::blank(&device, &queue).bind_group(
            &device,
            &tile_pipeline.atlas_bind_group_layout,
            "blank_atlas_bg",
        );

        info!("GPU ready: {}x{} {:?}", config.width, config.height, format);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            tile_pipeline,
            projection_buffer,
            projection_bind_group,
            blank_bind_group,
            tileset_bind_group: None,
            sprite_bind_groups: HashMap::new(),
        })
    }

    pub fn set_tileset(&mut self, image: &RgbaImage) {
        let atlas = Atlas::from_rgba(&self.device, &self.queue, image, "tileset_atlas");
        self.tileset_bind_group =
            Some(atlas.bind_group(&self.device, &self.tile_pipeline.atlas_bind_group_layout, "tileset_bg"));
    }

    pub fn set_sprite(&mut self, sprite: &'static str, image: &RgbaImage) {
        let atlas = Atlas::from_rgba(&self.device, &self.queue, image, sprite);
        let bind_group = atlas.bind_group(&self.device, &self.tile_pipeline.atlas_bind_group_layout, sprite);
        self.sprite_bind_groups.insert(sprite, bind_group);
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.config.width, self.config.height)
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);

        let proj = orthographic_projection(new_size.width as f32, new_size.height as f32);
        self.queue
            .write_buffer(&self.projection_buffer, 0, bytemuck::cast_slice(&proj));
    }

    /// Render one frame: map tiles first, then each sprite batch in order.
    pub fn render(&mut self, map_verts: &[TileVertex], sprites: &[SpriteBatch]) -> Result<(), wgpu::SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: None,
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.1,
                            g: 0.1,
                            b: 0.18,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            pass.set_pipeline(&self.tile_pipeline.render_pipeline);
            pass.set_bind_group(0, &self.projection_bind_group, &[]);

            if let (false, Some(tileset_bg)) = (map_verts.is_empty(), &self.tileset_bind_group) {
                let vbuf = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("map_vertex_buffer"),
                    contents: bytemuck::cast_slice(map_verts),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                pass.set_bind_group(1, tileset_bg, &[]);
                pass.set_vertex_buffer(0, vbuf.slice(..));
                pass.draw(0..map_verts.len() as u32, 0..1);
            }

            for batch in sprites.iter().filter(|b| !b.vertices.is_empty()) {
                let sprite_bg = self.sprite_bind_groups.get(batch.sprite).unwrap_or(&self.blank_bind_group);
                let vbuf = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("sprite_vertex_buffer"),
                    contents: bytemuck::cast_slice(&batch.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                pass.set_bind_group(1, sprite_bg, &[]);
                pass.set_vertex_buffer(0, vbuf.slice(..));
                pass.draw(0..batch.vertices.len() as u32, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}
