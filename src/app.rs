use crate::camera::CameraRig;
use crate::config::{load_settings, project_paths, save_settings_atomic, Cli, Settings};
use crate::content::{builtin_sections, load_content, Section, SECTION_COUNT};
use crate::input::{collect_input_nonblocking, map_event, normalized_pointer, InputAction, WHEEL_ROWS_PER_NOTCH};
use crate::render::{Terminal, TexturePool, CELL_PX_H, CELL_PX_W};
use crate::scene::{canvas_size, Scene};
use crate::scroll::{InputQueue, PointerEvent};
use crate::section::{swipe_target, CanvasSpec, Sections};
use crate::shell::NavShell;
use log::{debug, info, warn};
use std::time::{Duration, Instant};

/// Longest step the animation takes in one frame, seconds.
const MAX_FRAME_DT: f32 = 0.060;

pub(crate) struct App {
    settings: Settings,
    term: Terminal,
    pool: TexturePool,
    sections: Sections,
    queue: InputQueue,
    rig: CameraRig,
    scene: Scene,
    shell: NavShell,
    clock: Instant,
    dragging: bool,
    should_quit: bool,
    torn_down: bool,
}

impl App {
    fn init(cli: Cli) -> anyhow::Result<Self> {
        let paths = project_paths()?;
        if let Err(e) = crate::logging::init(&paths.log_path) {
            eprintln!("starfolio: logging disabled: {e:#}");
        }

        let settings = cli.apply(load_settings(&paths.settings_path));
        if cli.save_settings {
            save_settings_atomic(&paths.settings_path, &settings)?;
            info!("settings saved to {}", paths.settings_path.display());
        }
        info!("starting with {settings:?}");

        let content: Vec<Section> = match &cli.content {
            Some(path) => load_content(path)?,
            None => builtin_sections(),
        };
        let titles = content.iter().map(|s| s.title.clone()).collect();

        let sections = Sections::new(content, settings.start_section, settings.scroll);
        let rig = CameraRig::new(settings.start_section, settings.parallax);
        let scene = Scene::new(settings.star_count, settings.seed, settings.sprite_fraction);
        debug!("starfield with {} stars", scene.star_count());

        let term = Terminal::begin()?;

        Ok(Self {
            settings,
            term,
            pool: TexturePool::default(),
            sections,
            queue: InputQueue::default(),
            rig,
            scene,
            shell: NavShell::new(titles),
            clock: Instant::now(),
            dragging: false,
            should_quit: false,
            torn_down: false,
        })
    }

    fn canvas_spec(&self) -> CanvasSpec {
        let (cols, rows) = (self.term.cols, self.term.rows);
        let (w, h) = canvas_size(cols, rows, self.settings.dpr, self.scene.fraction());
        let more_room = self
            .settings
            .room_policy
            .more_room(cols as f32 * CELL_PX_W, rows as f32 * CELL_PX_H);
        CanvasSpec {
            w,
            h,
            dpr: self.settings.dpr,
            more_room,
        }
    }

    fn now(&self) -> f32 {
        self.clock.elapsed().as_secs_f32()
    }

    fn go_to(&mut self, index: usize) {
        if self.sections.set_active(index) {
            self.rig.set_section(index);
            self.dragging = false;
        }
    }

    fn step_section(&mut self, delta: i32) {
        let n = SECTION_COUNT as i32;
        let next = (self.sections.active() as i32 + delta).rem_euclid(n);
        self.go_to(next as usize);
    }

    fn handle(&mut self, action: InputAction) {
        let active = self.sections.active();
        match action {
            InputAction::Quit => self.should_quit = true,
            InputAction::Back => {
                if self.shell.help_open() {
                    self.shell.close_help();
                } else {
                    self.should_quit = true;
                }
            }
            InputAction::ToggleHelp => self.shell.toggle_help(),
            InputAction::Step(d) => self.step_section(d),
            InputAction::Jump(i) => self.go_to(i),
            InputAction::Press { col, row } => {
                if let Some(i) = self.shell.hit_test(self.term.cols, col, row) {
                    self.go_to(i);
                    return;
                }
                self.dragging = true;
                let t = self.now();
                self.queue.push(
                    active,
                    PointerEvent::Down {
                        x: col as f32,
                        y: row as f32,
                        t,
                    },
                );
            }
            InputAction::Drag { col, row } => {
                let (nx, ny) = normalized_pointer(col, row, self.term.cols, self.term.rows);
                self.rig.set_pointer(nx, ny);
                if self.dragging {
                    let t = self.now();
                    self.queue.push(
                        active,
                        PointerEvent::Move {
                            x: col as f32,
                            y: row as f32,
                            t,
                        },
                    );
                }
            }
            InputAction::Release => {
                if self.dragging {
                    self.dragging = false;
                    let t = self.now();
                    self.queue.push(active, PointerEvent::Up { t });
                }
            }
            InputAction::Wheel { notches } => {
                self.queue.push(
                    active,
                    PointerEvent::Wheel {
                        delta_y: notches * WHEEL_ROWS_PER_NOTCH,
                    },
                );
            }
            InputAction::Hover { col, row } => {
                let (nx, ny) = normalized_pointer(col, row, self.term.cols, self.term.rows);
                self.rig.set_pointer(nx, ny);
            }
            InputAction::Resize => {}
        }
    }

    fn step(&mut self, dt: f32) {
        if let Some(swipe) = self.sections.dispatch(&mut self.queue) {
            let active = self.sections.active();
            let next = swipe_target(active, swipe);
            info!("swipe {swipe:?}: section {active} -> {next}");
            self.go_to(next);
        }
        self.rig.update(dt);
        self.scene.update(dt);
        self.sections.update(dt, &mut self.pool);
        let active = self.sections.active();
        for notice in self.sections.take_notices() {
            debug!("shell notice {notice:?}");
            self.shell.apply(active, notice);
        }
    }

    fn render_frame(&mut self, dt: f32, canvas: CanvasSpec) -> anyhow::Result<()> {
        let cam = self.rig.camera();
        let (cols, rows) = (self.term.cols, self.term.rows);
        let sprites = self
            .scene
            .place_sprites(&mut self.sections, &cam, cols, rows, canvas.aspect(), dt);
        self.scene.draw(
            &mut self.term.cur,
            &mut self.term.dots,
            &self.pool,
            &self.sections,
            &cam,
            &sprites,
        );
        self.shell.draw(&mut self.term.cur, self.sections.active());
        self.term.present()
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let fps = self.settings.fps_cap.clamp(10, 240);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);
        let mut last_frame = Instant::now();

        while !self.should_quit {
            let frame_start = Instant::now();
            if self.term.resize_if_needed()? {
                info!("terminal resized to {}x{}", self.term.cols, self.term.rows);
            }

            for ev in collect_input_nonblocking(frame_dt)? {
                if let Some(action) = map_event(&ev) {
                    self.handle(action);
                }
                if self.should_quit {
                    break;
                }
            }

            let dt = frame_start
                .saturating_duration_since(last_frame)
                .as_secs_f32()
                .min(MAX_FRAME_DT);
            last_frame = frame_start;

            let canvas = self.canvas_spec();
            self.sections.set_canvas(canvas);
            self.step(dt);
            self.render_frame(dt, canvas)?;

            spin_sleep(frame_dt, frame_start);
        }
        Ok(())
    }

    /// Releases every section texture and restores the terminal. Safe to call
    /// more than once.
    fn teardown(&mut self) -> anyhow::Result<()> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;
        self.sections.release_all(&mut self.pool);
        if self.pool.live() > 0 {
            warn!("{} textures still live at shutdown", self.pool.live());
        }
        self.term.end()
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            eprintln!("starfolio: could not restore terminal: {e:#}");
        }
    }
}

pub(crate) fn run(cli: Cli) -> anyhow::Result<()> {
    let mut app = App::init(cli)?;
    let res = app.run();
    app.teardown()?;
    info!("bye");
    res
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

/// Sleeps until `target` has passed since `start`.
fn spin_sleep(target: Duration, start: Instant) {
    let end = start + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
