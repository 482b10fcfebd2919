//! Bouncing squares: instanced batches, render layers, collision groups and
//! collider debug lines.
//!
//! WASD moves the camera, Q/E zoom, C toggles collider outlines.

use coil::prelude::*;

const BOUNDS: Vec2 = Vec2::new(380.0, 280.0);

fn main() -> Result<(), EngineError> {
    coil::init_logging();
    coil::run(EngineConfig::default().title("coil — shapes"), Shapes::default())
}

#[derive(Default)]
struct Shapes {
    show_colliders: bool,
}

struct Bounce {
    velocity: Vec2,
    base: Color,
    flash: f32,
}

impl Behavior for Bounce {
    fn update(&mut self, entity: &mut Entity, dt: f32) {
        entity.transform.add_position(self.velocity * dt);
        let p = entity.transform.position();
        if p.x.abs() > BOUNDS.x {
            self.velocity.x = -self.velocity.x;
        }
        if p.y.abs() > BOUNDS.y {
            self.velocity.y = -self.velocity.y;
        }
        entity.transform.add_rotation(dt);

        self.flash = (self.flash - dt).max(0.0);
        entity.color = if self.flash > 0.0 { Color::WHITE } else { self.base };
    }

    fn on_collision(&mut self, _entity: &mut Entity, _other: &Entity) {
        self.flash = 0.15;
    }
}

impl Game for Shapes {
    fn init(&mut self, ctx: &mut Context) -> Result<(), EngineError> {
        ctx.renderer.register_render_layer("background", 0)?;
        ctx.renderer.register_render_layer("actors", 1)?;

        let quad = ctx.renderer.defaults().quad;
        let color = ctx.renderer.defaults().color_material;

        ctx.objects.add_object(
            Entity::new()
                .with_tag("floor")
                .with_mesh(quad)
                .with_material(color)
                .with_layer("background")
                .with_scale(BOUNDS * 2.0)
                .with_color(Color::rgb(0.15, 0.17, 0.22)),
        );

        let palette = [Color::RED, Color::GREEN, Color::BLUE, Color::YELLOW];
        for i in 0..40 {
            let t = i as f32;
            let mut ball = Entity::new()
                .with_tag("ball")
                .with_mesh(quad)
                .with_material(color)
                .with_layer("actors")
                .at((t * 37.0) % 700.0 - 350.0, (t * 53.0) % 500.0 - 250.0)
                .with_scale(Vec2::splat(16.0))
                .with_collider(Collider::aabb(Vec2::splat(0.5)).use_transform_scale(true))
                .with_behavior(Bounce {
                    velocity: Vec2::new((t * 1.7).cos(), (t * 2.3).sin()) * 120.0,
                    base: palette[i % palette.len()],
                    flash: 0.0,
                });
            ball.set_collision(ctx.objects.groups_mut(), "ball", &["ball"]);
            ctx.objects.add_object(ball);
        }
        Ok(())
    }

    fn update(&mut self, ctx: &mut Context, dt: f32) {
        let mut delta = Vec2::ZERO;
        if ctx.input.key_held(KeyCode::KeyW) { delta.y += 1.0; }
        if ctx.input.key_held(KeyCode::KeyS) { delta.y -= 1.0; }
        if ctx.input.key_held(KeyCode::KeyA) { delta.x -= 1.0; }
        if ctx.input.key_held(KeyCode::KeyD) { delta.x += 1.0; }

        let camera = ctx.cameras.active_mut();
        camera.add_position(delta * 300.0 * dt);
        if ctx.input.key_held(KeyCode::KeyQ) {
            camera.set_zoom(camera.zoom * (1.0 - dt));
        }
        if ctx.input.key_held(KeyCode::KeyE) {
            camera.set_zoom(camera.zoom * (1.0 + dt));
        }
        if ctx.input.key_pressed(KeyCode::KeyC) {
            self.show_colliders = !self.show_colliders;
        }
        if ctx.input.key_pressed(KeyCode::KeyP) {
            log::info!("{:?}", ctx.renderer.stats());
        }
    }

    fn draw(&mut self, ctx: &mut Context) {
        ctx.draw_objects();
        if self.show_colliders {
            ctx.objects
                .draw_collider_debug(&mut ctx.renderer, ctx.cameras.active(), Color::GREEN, 1.0);
        }
    }
}
