//! Text objects: alignment, multiline strings, a live counter that keeps
//! baking new glyphs into the atlas, and a HUD pinned to the screen.
//!
//! Usage: `cargo run --example text -- path/to/font.ttf`
//! (or set `COIL_FONT`). Arrow keys move the camera; the HUD stays put.

use coil::prelude::*;

fn main() -> Result<(), EngineError> {
    coil::init_logging();
    let font_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("COIL_FONT").ok())
        .ok_or_else(|| EngineError::AssetLoad {
            path: String::new(),
            reason: "pass a .ttf/.otf path as the first argument or in COIL_FONT".to_owned(),
        })?;
    coil::run(
        EngineConfig::default().title("coil — text"),
        TextDemo {
            font_path,
            counter: None,
            elapsed: 0.0,
        },
    )
}

struct TextDemo {
    font_path: String,
    counter: Option<EntityId>,
    elapsed: f32,
}

impl TextDemo {
    fn label(ctx: &mut Context, font: FontHandle, text: &str, x: f32, y: f32, align: HorizontalAlign) -> EntityId {
        let text = ctx
            .objects
            .text_object(font, text)
            .with_align(align, VerticalAlign::Middle);
        ctx.objects.add_object(Entity::text(text).at(x, y))
    }
}

impl Game for TextDemo {
    fn init(&mut self, ctx: &mut Context) -> Result<(), EngineError> {
        let body = ctx.renderer.load_font("body", &self.font_path, 24)?;
        let title = ctx.renderer.load_font("title", &self.font_path, 48)?;

        Self::label(ctx, title, "coil text", 0.0, 200.0, HorizontalAlign::Center);
        Self::label(ctx, body, "left\naligned", -300.0, 60.0, HorizontalAlign::Left);
        Self::label(ctx, body, "centered\nblock", 0.0, 60.0, HorizontalAlign::Center);
        Self::label(ctx, body, "right\naligned", 300.0, 60.0, HorizontalAlign::Right);
        Self::label(ctx, body, "Ünïcødé → ✓", 0.0, -60.0, HorizontalAlign::Center);
        self.counter = Some(Self::label(ctx, body, "0.00", 0.0, -140.0, HorizontalAlign::Center));

        let hud = ctx.cameras.active_id();
        let mut pinned = Entity::text(
            ctx.objects
                .text_object(body, "HUD: pinned to the screen")
                .with_align(HorizontalAlign::Left, VerticalAlign::Top),
        )
        .at(-390.0, 290.0)
        .with_color(Color::YELLOW);
        pinned.set_ignore_camera(true, Some(hud));
        ctx.objects.add_object(pinned);
        Ok(())
    }

    fn update(&mut self, ctx: &mut Context, dt: f32) {
        self.elapsed += dt;
        if let Some(text) = self
            .counter
            .and_then(|id| ctx.objects.get_mut(id))
            .and_then(Entity::text_object_mut)
        {
            text.set_text(&format!("{:.2}", self.elapsed));
        }

        let mut delta = Vec2::ZERO;
        if ctx.input.key_held(KeyCode::ArrowUp) { delta.y += 1.0; }
        if ctx.input.key_held(KeyCode::ArrowDown) { delta.y -= 1.0; }
        if ctx.input.key_held(KeyCode::ArrowLeft) { delta.x -= 1.0; }
        if ctx.input.key_held(KeyCode::ArrowRight) { delta.x += 1.0; }
        ctx.cameras.active_mut().add_position(delta * 200.0 * dt);
    }
}
