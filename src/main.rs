// Paint LiveCam: draw in the air with your index finger over the webcam feed.
//
// • Index finger up: draw.  "V" (middle finger up too): pause / press buttons.
// • End a stroke on your face and it sticks to your face.
// • I toggles the buttons, C clears, S saves a PNG, Q / ESC quits.
// • --simulate (or no detector): left mouse draws, right mouse points,
//   hold F for a face under the cursor.

use clap::Parser;
use log::{debug, info, warn};
use paint_livecam::app;
use paint_livecam::camera::CameraCapture;
use paint_livecam::compositor::{fit_frame, Compositor, Overlay};
use paint_livecam::config::Config;
use paint_livecam::engine::{Engine, EngineEvent};
use paint_livecam::error::Error;
use paint_livecam::perception::{
    DetectorSettings, Perceiver, Perception, SimulatedPerceiver, SubprocessPerceiver,
};
use paint_livecam::save::save_png;
use paint_livecam::types::FrameBuffer;
use paint_livecam::window::Drawer;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "paint-livecam")]
#[command(author, version, about = "Finger painting over a live webcam feed", long_about = None)]
struct Args {
    /// TOML config file (defaults are used for anything it leaves out)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Camera index, overrides the config
    #[arg(long)]
    camera: Option<u32>,

    /// Use the mouse instead of the hand/face detector
    #[arg(long)]
    simulate: bool,

    /// Directory for saved drawings, overrides the config
    #[arg(long)]
    save_dir: Option<PathBuf>,
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(index) = args.camera {
        config.camera_index = index;
    }
    if let Some(dir) = args.save_dir {
        config.save_directory = dir;
    }
    config.validate()?;

    /* --- Camera + window --- */
    let mut cam = CameraCapture::new(
        config.camera_index,
        config.capture_width,
        config.capture_height,
        config.mirror_camera,
    )?;
    let (w, h) = cam.resolution();
    let (w, h) = (w as usize, h as usize);
    info!("Camera {} delivering {w}x{h}", config.camera_index);

    let mut drawer = Drawer::new(&config.window_title, config.window_width, config.window_height)?;

    /* --- Engine works in camera pixel space --- */
    let mut engine = Engine::new(&config, w, h);
    let compositor = Compositor::new(&config);
    let mut screen = FrameBuffer::new(w, h);

    /* --- Perception: real detector unless asked (or forced) to simulate --- */
    let mut detector = if args.simulate {
        None
    } else {
        match SubprocessPerceiver::spawn(&config.detector_command, DetectorSettings::from_config(&config)) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("Detector unavailable ({e}); falling back to mouse simulation");
                None
            }
        }
    };
    let mut simulated = SimulatedPerceiver::new(config.ui_finger);

    info!("Index finger draws; raise the middle finger too (V) to pause and press buttons");
    info!("End a stroke on a face to make it follow the face");
    info!("Keys: I toggle buttons, C clear, S save, Q/ESC quit");
    if detector.is_none() {
        info!("Simulation: left mouse draws, right mouse points, hold F for a face");
    }

    /* --- FPS --- */
    let mut last_fps_time = Instant::now();
    let mut frames_this_second: u32 = 0;
    let mut fps: Option<f32> = None;

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !drawer.quit_pressed() {
        let now = Instant::now();

        // 1) Fresh camera frame.
        let mut live = cam.next_frame()?;
        if live.width != w || live.height != h {
            debug!("Camera frame {}x{} scaled to {w}x{h}", live.width, live.height);
            live = fit_frame(&live, w, h);
        }

        // 2) Detect hands and faces.
        let detected = detector.as_mut().map(|p| p.detect(&live));
        let perception = match detected {
            Some(Ok(found)) => found,
            Some(Err(e)) => {
                warn!("Detector failed ({e}); switching to mouse simulation");
                detector = None;
                Perception::default()
            }
            None => {
                simulated.set_input(drawer.sim_input(live.width, live.height));
                simulated.detect(&live)?
            }
        };

        // 3) Engine tick.
        let fingers = app::step(&mut engine, &perception, config.ui_finger);

        // 4) Keys.
        if drawer.toggle_ui_pressed() {
            engine.toggle_ui();
        }
        if drawer.clear_pressed() {
            engine.clear();
        }
        let mut save_now = drawer.save_pressed();

        // 5) Compose what you see.
        let overlay = Overlay {
            hand: perception.hands.first(),
            fingers,
            faces: &perception.faces,
            fps,
        };
        compositor.compose(&mut screen, &live, &engine, &overlay)?;

        // 6) Side effects the engine asked for.
        for event in engine.take_events() {
            match event {
                EngineEvent::SaveRequested => save_now = true,
                other => debug!("{other:?}"),
            }
        }
        if save_now {
            if let Err(e) = save_png(&screen, &config.save_directory, &config.save_prefix) {
                warn!("Could not save drawing: {e}");
            }
        }

        // 7) Present.
        drawer.present(&screen)?;

        // 8) FPS, refreshed once per second.
        frames_this_second += 1;
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let secs = now.duration_since(last_fps_time).as_secs_f32();
            let current = frames_this_second as f32 / secs;
            debug!("FPS: {current:.1}");
            fps = Some(current);
            frames_this_second = 0;
            last_fps_time = now;
        }
    }

    info!("Bye");
    Ok(())
}
