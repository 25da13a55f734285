use drawtree::{
    BezPath, DiffuseLighting, Drawing, DrawingConfig, EnvConfig, Filter, FilterInput,
    FilterPrimitive, IntRect, LightSource, PrimitiveOp, Rect, RenderFlags, ShapeData,
    StateFlags, Surface,
};

fn rounded(x: f64, y: f64, w: f64, h: f64) -> BezPath {
    kurbo::Shape::to_path(&kurbo::RoundedRect::new(x, y, x + w, y + h, 12.0), 0.1)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = match std::env::args().nth(2) {
        Some(path) => DrawingConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => DrawingConfig::default(),
    };
    let mut drawing = Drawing::with_config_source(std::sync::Arc::new(EnvConfig::new(config)));

    let root = drawing.create_group();
    for i in 0..6 {
        let o = f64::from(i) * 30.0;
        let card = drawing.create_shape(ShapeData::filled(
            rounded(20.0 + o, 20.0 + o, 160.0, 110.0),
            [40 + 30 * i as u8, 90, 200 - 25 * i as u8, 255],
        ));
        drawing.append_child(root, card)?;
    }

    let embossed = drawing.create_shape(ShapeData::filled(
        rounded(260.0, 40.0, 180.0, 180.0),
        [0, 0, 0, 255],
    ));
    drawing.set_filter(
        embossed,
        Some(Filter::new(vec![
            FilterPrimitive::new(PrimitiveOp::gaussian_blur(4.0))
                .with_input(FilterInput::SourceAlpha),
            FilterPrimitive::new(PrimitiveOp::DiffuseLighting(DiffuseLighting {
                surface_scale: 4.0,
                light: Some(LightSource::Distant {
                    azimuth: 225.0,
                    elevation: 45.0,
                }),
                ..DiffuseLighting::default()
            })),
        ])),
    );
    drawing.append_child(root, embossed)?;
    drawing.set_root(Some(root));

    let area = IntRect::new(0, 0, 480, 360).ok_or_else(|| anyhow::anyhow!("empty canvas"))?;
    drawing.set_cache_limit(Some(area), false);
    drawing.set_cache_score_threshold(1_000.0);
    drawing.update(Some(area), StateFlags::ALL, StateFlags::empty());
    println!("cached items: {}", drawing.cached_items().len());

    if drawing.prerender(area) {
        drawing.finish_prerender();
    }
    let mut target = Surface::new(area)?;
    drawing.render(&mut target, area, RenderFlags::empty(), None);

    let out = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "drawtree-demo.png".to_owned());
    target.to_rgba_image().save(&out)?;
    println!("wrote {out}, average colour {:?}", drawing.average_color(area));
    Ok(())
}
