//! The game client: a winit event loop driving a [`GameSession`] and the
//! wgpu [`Renderer`], with quest requests running on a tokio runtime.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context};
use log::{debug, error, info, warn};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::assets::{self, ClientSource};
use crate::config::{ClientConfig, Config};
use crate::input::KeyboardHub;
use crate::quest::{Quest, QuestClient, QuestError};
use crate::renderer::batch::{
    first_frame_uv, map_vertices, placement_batches, player_vertices, sprite_placements, SpriteBatch,
};
use crate::renderer::pipeline::TileVertex;
use crate::renderer::Renderer;
use crate::session::{GameSession, SlotGuard};

pub const WINDOW_TITLE: &str = "SgravoQuest";

/// Events delivered to the UI thread from background work.
#[derive(Debug)]
pub enum GameEvent {
    /// A quest request finished. The slot stays claimed until `guard` drops.
    QuestReady { result: Result<Quest, QuestError>, guard: SlotGuard },
}

pub fn run(config: Config) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let tileset = *assets::tileset(&config.client.tileset)
        .ok_or_else(|| anyhow!("Unknown tileset '{}'", config.client.tileset))?;

    let event_loop = EventLoop::<GameEvent>::with_user_event()
        .build()
        .context("Failed to create event loop")?;

    let hub = KeyboardHub::new();
    let session = GameSession::new(&config.client, tileset, hub.attach());
    let fixed_dt = 1.0 / config.client.ups as f32;

    let mut app = App {
        quest_client: QuestClient::new(&config.client.proxy_url),
        config: config.client,
        runtime,
        proxy: event_loop.create_proxy(),
        hub,
        session,
        renderer: None,
        sprite_uvs: HashMap::new(),
        map_verts: Vec::new(),
        placement_batches: Vec::new(),
        map_verts_dirty: true,
        last_instant: None,
        accumulator: 0.0,
        fixed_dt,
    };
    event_loop.run_app(&mut app).context("Event loop failed")?;
    Ok(())
}

// ── App (winit ApplicationHandler) ──────────────────────────────────────────

struct App {
    config: ClientConfig,
    runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<GameEvent>,
    quest_client: QuestClient,
    hub: KeyboardHub,
    session: GameSession,
    renderer: Option<Renderer>,
    /// UV extent of each loaded sprite's first frame.
    sprite_uvs: HashMap<&'static str, [f32; 2]>,
    map_verts: Vec<TileVertex>,
    /// NPC, enemy and item quads; rebuilt with `map_verts`.
    placement_batches: Vec<SpriteBatch>,
    map_verts_dirty: bool,
    last_instant: Option<Instant>,
    accumulator: f32,
    fixed_dt: f32,
}

impl App {
    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window = Arc::new(
            event_loop.create_window(
                Window::default_attributes()
                    .with_title(WINDOW_TITLE)
                    .with_inner_size(winit::dpi::PhysicalSize::new(
                        self.config.window_width,
                        self.config.window_height,
                    )),
            )?,
        );
        let size = window.inner_size();
        let renderer = pollster::block_on(Renderer::new(window))?;
        self.session.resize(size.width, size.height);
        self.renderer = Some(renderer);
        Ok(())
    }

    /// Fetch the tileset and every catalog sprite. Failures leave the map
    /// without tiles or sprites as flat squares; the game keeps running.
    fn load_assets(&mut self) {
        let source = ClientSource::from_mirror_dir(self.config.asset_dir.as_deref());

        match self.runtime.block_on(self.session.load(&source)) {
            Ok(summary) => {
                info!("Map ready: {} tiles placed, scale {:.2}", summary.placed, summary.scale);
                if let (Some(renderer), Some(textures)) = (self.renderer.as_mut(), self.session.tiles().textures()) {
                    renderer.set_tileset(textures.image());
                }
                self.map_verts_dirty = true;
            }
            Err(e) => error!("Tileset unavailable, map will not be drawn: {e}"),
        }

        for sprite in assets::SPRITES {
            match self.runtime.block_on(assets::load_sprite(&source, sprite)) {
                Ok(image) => {
                    let uv = first_frame_uv(image.width(), image.height(), sprite.frame_width, sprite.frame_height);
                    self.sprite_uvs.insert(sprite.id, uv);
                    if let Some(renderer) = self.renderer.as_mut() {
                        renderer.set_sprite(sprite.id, &image);
                    }
                }
                Err(e) => warn!("Sprite '{}' unavailable: {e}", sprite.id),
            }
        }
    }

    fn request_quest(&mut self) {
        if self.session.lifetime().is_cancelled() {
            return;
        }
        let Some(guard) = self.session.slot().try_acquire() else {
            warn!("Quest request already in flight, ignoring");
            return;
        };
        info!("Requesting quest: {}", self.config.default_prompt);

        let client = self.quest_client.clone();
        let prompt = self.config.default_prompt.clone();
        let proxy = self.proxy.clone();
        let lifetime = self.session.lifetime().clone();
        self.runtime.spawn(async move {
            let result = client.request(&prompt).await;
            if lifetime.is_cancelled() {
                debug!("Session closed before quest arrived");
                return;
            }
            if proxy.send_event(GameEvent::QuestReady { result, guard }).is_err() {
                debug!("Event loop closed before quest arrived");
            }
        });
    }

    fn step(&mut self, elapsed: f32) {
        self.accumulator += elapsed;
        while self.accumulator >= self.fixed_dt {
            self.session.tick();
            self.accumulator -= self.fixed_dt;
        }
    }

    fn draw(&mut self) {
        if self.session.tiles().is_loaded() {
            match self.session.redraw_if_dirty() {
                Ok(Some(summary)) => {
                    debug!("Map laid out: {} placed, {} empty, {} unknown", summary.placed, summary.empty, summary.unknown);
                    self.map_verts_dirty = true;
                }
                Ok(None) => {}
                Err(e) => error!("Map render failed: {e}"),
            }
        }

        let transform = self.session.tiles().transform();
        let player = self.session.player();
        if self.map_verts_dirty {
            self.map_verts = map_vertices(self.session.tiles());
            let placements = self.session.quest().map(sprite_placements).unwrap_or_default();
            self.placement_batches = placement_batches(&placements, player.tile_size(), transform, &self.sprite_uvs);
            self.map_verts_dirty = false;
        }

        let player_sprite = assets::sprite(&self.config.player_sprite).map_or("hero", |s| s.id);
        let player_batch = SpriteBatch {
            sprite: player_sprite,
            vertices: player_vertices(
                player.pixel_position(),
                player.tile_size(),
                transform,
                self.sprite_uvs.get(player_sprite).copied(),
            )
            .to_vec(),
        };

        let mut sprites = self.placement_batches.clone();
        sprites.push(player_batch);

        let Some(renderer) = self.renderer.as_mut() else { return };
        match renderer.render(&self.map_verts, &sprites) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost) => {
                let size = renderer.window.inner_size();
                renderer.resize(size);
            }
            Err(e) => error!("render error: {e}"),
        }
    }
}

impl ApplicationHandler<GameEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        if let Err(e) = self.init_graphics(event_loop) {
            error!("Failed to initialise graphics: {e:#}");
            event_loop.exit();
            return;
        }
        self.load_assets();
        info!("Arrows/WASD to move, G to generate a quest, Escape to quit");
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: GameEvent) {
        match event {
            GameEvent::QuestReady { result, guard } => {
                if self.session.lifetime().is_cancelled() {
                    return;
                }
                match result {
                    Ok(quest) => {
                        if let Err(e) = self.session.apply_quest(quest) {
                            error!("Quest could not be applied: {e}");
                        }
                    }
                    Err(e) => error!("Quest request failed: {e}"),
                }
                drop(guard);
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = self.renderer.as_ref() {
            renderer.window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size);
                }
                self.session.resize(size.width, size.height);
                self.map_verts_dirty = true;
            }

            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let elapsed = match self.last_instant {
                    Some(prev) => now.duration_since(prev).as_secs_f32().min(0.25),
                    None => self.fixed_dt,
                };
                self.last_instant = Some(now);
                self.step(elapsed);
                self.draw();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat,
                        ..
                    },
                ..
            } => {
                self.hub.dispatch(code, state);
                if state == ElementState::Pressed && !repeat {
                    match code {
                        KeyCode::KeyG => self.request_quest(),
                        KeyCode::Escape => event_loop.exit(),
                        _ => {}
                    }
                }
            }

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.session.teardown();
    }
}
