use bevy::prelude::*;
use bevy::render::RenderPlugin;
use bevy::render::settings::{RenderCreation, WgpuSettings};
use bevy::window::{PresentMode, Window, WindowPlugin};

use bevy_panorbit_camera::PanOrbitCameraPlugin;

#[cfg(feature = "dev")]
use bevy::dev_tools::fps_overlay::FpsOverlayPlugin;

mod core;
mod globe;
mod scene;
mod sync;

use crate::core::OverlayConfig;
use globe::GlobePlugin;
use scene::ScenePlugin;
use sync::CameraSyncPlugin;

fn main() {
    let mut app = App::new();

    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Globe Overlay".to_string(),
                    present_mode: PresentMode::AutoVsync,
                    ..default()
                }),
                ..default()
            })
            .set(RenderPlugin {
                render_creation: RenderCreation::Automatic(WgpuSettings { ..default() }),
                ..default()
            }),
    );

    #[cfg(feature = "dev")]
    app.add_plugins(FpsOverlayPlugin::default());

    // Loaded after DefaultPlugins so the log subscriber is up.
    let config = OverlayConfig::load().unwrap_or_else(|err| {
        warn!("Failed to load overlay config, using defaults: {err:#}");
        OverlayConfig::default()
    });
    app.insert_resource(config);

    app.add_plugins(PanOrbitCameraPlugin);
    app.add_plugins(GlobePlugin);
    app.add_plugins(CameraSyncPlugin);
    app.add_plugins(ScenePlugin);

    app.run();
}
