mod common;

use common::{filled_scan_png, geometry, LETTERS};
use handfont::font::testing::{StubCompiler, StubTracer};
use handfont::font::{inspect_file, GlyphSource, PaletteRequest, SourceKind};
use handfont::segmentation::WarpOutcome;
use handfont::{
    build_font, build_font_with_outcome, export_candidates, segment, segment_with_report,
    BuildRequest, ColorMode, Error, FontBuildError, SegmenterParams,
};
use tempfile::TempDir;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn unwarped_page_yields_every_cell() {
    init_logs();
    let geom = geometry();
    let scan = filled_scan_png(&geom);

    let report =
        segment_with_report(&scan, &geom, LETTERS, &SegmenterParams::default()).expect("segment");
    assert_eq!(report.warp, WarpOutcome::FiducialsNotFound);
    assert_eq!(report.candidates.len(), 30);

    let candidates = segment(&scan, &geom, "ABC").expect("segment");
    let letters: String = candidates.iter().map(|c| c.letter).collect();
    assert_eq!(letters, "ABC");
}

#[test]
fn undecodable_scan_is_a_segment_error() {
    let err = segment(b"not an image", &geometry(), "A").expect_err("must fail");
    assert!(matches!(err, Error::Segment(_)));
}

#[test]
fn exported_glyphs_build_into_a_font() {
    init_logs();
    let geom = geometry();
    let scan = filled_scan_png(&geom);
    let glyph_dir = TempDir::new().expect("tmp");
    let out_dir = TempDir::new().expect("tmp");

    let candidates = segment(&scan, &geom, "ABCDE").expect("segment");
    let written = export_candidates(&candidates, glyph_dir.path(), geom.dpi).expect("export");
    assert_eq!(written.len(), 5);
    assert!(glyph_dir.path().join("A_0.png").is_file());
    assert!(glyph_dir.path().join("E_0.png").is_file());

    let sources = GlyphSource::scan_dir(glyph_dir.path()).expect("scan dir");
    let output = out_dir.path().join("Hand.ttf");
    let request = BuildRequest::new(sources, "ABCX", "Scanned Hand", &output);
    let compiler = StubCompiler::default();
    let tracer = StubTracer::default();
    let path = build_font(&request, &compiler, &tracer).expect("build");
    assert_eq!(path, output);
    assert_eq!(tracer.calls(), 3, "only alphabet letters are traced");

    let report = inspect_file(&path, "ABCX").expect("inspect");
    assert_eq!(report.family.as_deref(), Some("Scanned Hand"));
    assert_eq!(report.missing, "X");
}

#[test]
fn color_request_uses_vector_sources() {
    let src = TempDir::new().expect("tmp");
    let out_dir = TempDir::new().expect("tmp");
    let svg = src.path().join("A.svg");
    std::fs::write(
        &svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg"><g data-slot="accent"><path d="M0 0 L9 9"/></g></svg>"#,
    )
    .expect("write svg");
    let png = src.path().join("A.png");
    std::fs::write(&png, b"raster sources are ignored for color builds").expect("write png");

    let sources = vec![
        GlyphSource::new("A", &png, SourceKind::Raster),
        GlyphSource::new("A", &svg, SourceKind::Vector),
    ];
    let palette = PaletteRequest {
        accent: Some("336699".to_string()),
        ..PaletteRequest::default()
    };
    let request = BuildRequest::new(sources, "A", "Accent", out_dir.path().join("a.ttf"))
        .color(Some(palette));
    let compiler = StubCompiler::default();
    let tracer = StubTracer::default();
    let outcome = build_font_with_outcome(&request, &compiler, &tracer).expect("build");

    assert_eq!(outcome.mode, ColorMode::Color);
    assert_eq!(tracer.calls(), 0);
    let color = outcome.color.expect("color tables");
    assert_eq!(color.palette[1].to_hex(), "#336699ff");
    let layers: Vec<u16> = color
        .layers
        .bases
        .values()
        .flatten()
        .map(|l| l.palette_index)
        .collect();
    // 'A' has its accent layer, the space falls back to itself at index 0.
    assert!(layers.contains(&1));
}

#[test]
fn empty_mapping_reports_no_usable_glyphs() {
    let out_dir = TempDir::new().expect("tmp");
    let request = BuildRequest::new(Vec::new(), "AB", "Nothing", out_dir.path().join("n.ttf"));
    let err = build_font(&request, &StubCompiler::default(), &StubTracer::default())
        .expect_err("must fail");
    assert!(matches!(
        err,
        Error::Font(FontBuildError::NoUsableGlyphs { ref alphabet }) if alphabet == "AB"
    ));
}

#[test]
fn second_export_adds_variants_without_overwriting() {
    let geom = geometry();
    let glyph_dir = TempDir::new().expect("tmp");
    let first = segment(&filled_scan_png(&geom), &geom, "AB").expect("segment");
    let mut second = segment(&filled_scan_png(&geom), &geom, "BA").expect("segment");
    // mark the second page so its files can be told apart
    for c in &mut second {
        c.image.data.fill(255);
    }

    let a = export_candidates(&first, glyph_dir.path(), geom.dpi).expect("export");
    let b = export_candidates(&second, glyph_dir.path(), geom.dpi).expect("export");
    let names = |paths: &[std::path::PathBuf]| -> Vec<String> {
        paths
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
            .collect()
    };
    assert_eq!(names(&a), vec!["A_0.png", "B_0.png"]);
    assert_eq!(names(&b), vec!["B_1.png", "A_1.png"]);

    let sources = GlyphSource::scan_dir(glyph_dir.path()).expect("scan dir");
    let order: Vec<String> = sources
        .iter()
        .filter_map(|s| s.path.file_name()?.to_str().map(str::to_string))
        .collect();
    assert_eq!(order, vec!["A_0.png", "A_1.png", "B_0.png", "B_1.png"]);

    let kept = image::open(glyph_dir.path().join("A_0.png"))
        .expect("decode")
        .to_luma8();
    assert!(kept.pixels().any(|p| p.0[0] < 128), "first page ink survives");
}

#[test]
fn readiness_counts_only_usable_sources() {
    let dir = TempDir::new().expect("tmp");
    let a = dir.path().join("A.png");
    let c = dir.path().join("C.svg");
    std::fs::write(&a, b"png").expect("write");
    std::fs::write(&c, b"svg").expect("write");
    let sources = vec![
        GlyphSource::new("A", &a, SourceKind::Raster),
        GlyphSource::new("B", dir.path().join("gone.png"), SourceKind::Raster),
        GlyphSource::new("C", &c, SourceKind::Vector),
    ];
    let request = BuildRequest::new(sources, "ABC", "Partial", dir.path().join("p.ttf"));
    let status = request.readiness();
    assert!(!status.ready);
    assert_eq!(status.missing_chars, "BC");

    let full = BuildRequest::new(
        vec![GlyphSource::new("A", &a, SourceKind::Raster)],
        "A",
        "Full",
        dir.path().join("f.ttf"),
    );
    assert!(full.readiness().ready);
}
