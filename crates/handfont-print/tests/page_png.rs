use handfont_core::TemplateSpec;
use handfont_print::{render_template, write_png, RenderOptions};

#[test]
fn written_page_decodes_to_template_raster() {
    let mut spec = TemplateSpec::a4_grid(4, 4, 25.0);
    spec.paper.dpi = 72;
    let geom = spec.geometry().expect("geometry");
    let page = render_template(&geom, "HAND", &RenderOptions::default());

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("template.png");
    write_png(&path, &page, geom.dpi).expect("write png");

    let decoder = png::Decoder::new(std::io::BufReader::new(
        std::fs::File::open(&path).expect("open"),
    ));
    let mut reader = decoder.read_info().expect("png header");
    let mut buf = vec![0u8; page.data.len()];
    let info = reader.next_frame(&mut buf).expect("frame");

    assert_eq!(info.width as usize, geom.raster_width_px);
    assert_eq!(info.height as usize, geom.raster_height_px);
    assert_eq!(&buf[..info.buffer_size()], page.data.as_slice());

    let dims = reader.info().pixel_dims.expect("pHYs chunk");
    assert!(matches!(dims.unit, png::Unit::Meter));
    assert_eq!(dims.xppu, (72.0_f64 / 0.0254).round() as u32);
}
