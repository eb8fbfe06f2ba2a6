use handfont_core::{homography_from_4pt, warp_perspective_gray, GrayImage, TemplateGeometry, TemplateSpec};
use handfont_print::{draw_text, encode_png, render_template, text_size, RenderOptions};
use handfont_segment::{
    SegmentError, Segmenter, SegmenterParams, ThresholdBranch, WarpOutcome, WarpTarget,
};
use image::DynamicImage;
use nalgebra::Point2;

const LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123";
const INK: u8 = 20;
const PEN_SCALE: usize = 10;
const BLANK: [usize; 5] = [2, 9, 16, 21, 27];

/// Every cell except `BLANK`; a realistically inked page.
fn mostly_filled() -> Vec<usize> {
    (0..30).filter(|i| !BLANK.contains(i)).collect()
}

fn geometry() -> TemplateGeometry {
    let mut spec = TemplateSpec::a4_grid(6, 5, 30.0);
    spec.paper.dpi = 100;
    spec.geometry().expect("template geometry")
}

/// Blank template with `letters[i]` handwritten into cell `i` for each `i` in `cells`.
fn filled_page(geom: &TemplateGeometry, cells: &[usize]) -> GrayImage {
    let mut page = render_template(geom, "", &RenderOptions::default());
    let letters: Vec<char> = LETTERS.chars().collect();
    for &i in cells {
        let rect = geom.cell_rects[i];
        let text = letters[i].to_string();
        let (tw, th) = text_size(&text, PEN_SCALE);
        let x = rect.x0 + (rect.width() - tw) / 2;
        let y = rect.y0 + (rect.height() - th) / 2;
        draw_text(&mut page, x, y, &text, PEN_SCALE, INK);
    }
    page
}

fn erase_fiducials(geom: &TemplateGeometry, page: &mut GrayImage) {
    for b in &geom.fiducial_boxes {
        page.fill_rect(b.x0, b.y0, b.x1, b.y1, 255);
    }
}

fn to_dynamic(img: &GrayImage) -> DynamicImage {
    let buf = image::GrayImage::from_raw(img.width as u32, img.height as u32, img.data.clone())
        .expect("buffer matches size");
    DynamicImage::ImageLuma8(buf)
}

fn cell_indices(report: &handfont_segment::SegmentationReport) -> Vec<usize> {
    report.candidates.iter().map(|c| c.cell_index).collect()
}

#[test]
fn page_without_fiducials_still_yields_every_cell() {
    let geom = geometry();
    let all: Vec<usize> = (0..30).collect();
    let mut page = filled_page(&geom, &all);
    erase_fiducials(&geom, &mut page);

    let segmenter = Segmenter::new(geom, SegmenterParams::default());
    let report = segmenter.segment_image(&to_dynamic(&page), LETTERS);

    assert_eq!(report.warp, WarpOutcome::FiducialsNotFound);
    assert_eq!(report.threshold.branch, ThresholdBranch::Percentile);
    assert!((0.005..=0.7).contains(&report.ink_ratio));
    assert_eq!(cell_indices(&report), all);
    for (c, expected) in report.candidates.iter().zip(LETTERS.chars()) {
        assert_eq!(c.letter, expected);
        assert_eq!((c.image.width, c.image.height), (1024, 1024));
        assert!(c.image.data.iter().any(|&v| v == 0));
        assert_eq!(c.image.get(0, 0), 255);
    }
}

#[test]
fn printed_fiducials_enable_the_warp() {
    let geom = geometry();
    let cells = mostly_filled();
    let page = filled_page(&geom, &cells);

    let segmenter = Segmenter::new(geom.clone(), SegmenterParams::default());
    let report = segmenter.segment_image(&to_dynamic(&page), LETTERS);

    assert_eq!(report.warp, WarpOutcome::Applied);
    let quad = report.quad.expect("quad");
    let tl = geom.fiducial_boxes[0];
    assert!((quad[0].x - (tl.x0 as f32 + tl.width() as f32 / 2.0)).abs() < 1.5);
    assert_eq!(cell_indices(&report), cells);
    assert_eq!(report.cells_examined, 30);
    assert_eq!(report.empty_cells, BLANK.len());
    assert!(report.warped_page.is_none());
}

#[test]
fn skewed_scan_is_rectified_onto_template_cells() {
    let geom = geometry();
    let cells = mostly_filled();
    let page = filled_page(&geom, &cells);

    // Photograph the page at an angle: template corners land on a skewed quad.
    let (w, h) = (geom.raster_width_px as f32, geom.raster_height_px as f32);
    let scan_quad = [
        Point2::new(40.0, 25.0),
        Point2::new(880.0, 60.0),
        Point2::new(860.0, 1230.0),
        Point2::new(20.0, 1200.0),
    ];
    let page_quad = [
        Point2::new(0.0, 0.0),
        Point2::new(w, 0.0),
        Point2::new(w, h),
        Point2::new(0.0, h),
    ];
    let template_from_scan = homography_from_4pt(&scan_quad, &page_quad).expect("homography");
    let inverted = GrayImage {
        width: page.width,
        height: page.height,
        data: page.data.iter().map(|v| 255 - v).collect(),
    };
    let mut scan = warp_perspective_gray(&inverted.view(), &template_from_scan, 920, 1260);
    scan.data.iter_mut().for_each(|v| *v = 255 - *v);

    let mut params = SegmenterParams::default();
    params.warp.target = WarpTarget::FiducialCenters;
    params.build_warped_page = true;
    let segmenter = Segmenter::new(geom.clone(), params);
    let report = segmenter.segment_image(&to_dynamic(&scan), LETTERS);

    assert_eq!(report.warp, WarpOutcome::Applied);
    assert_eq!(report.scan_size, (920, 1260));
    assert_eq!(cell_indices(&report), cells);
    let warped = report.warped_page.expect("warped page kept");
    assert_eq!(
        (warped.width() as usize, warped.height() as usize),
        (geom.raster_width_px, geom.raster_height_px)
    );
}

#[test]
fn letter_count_bounds_the_output() {
    let geom = geometry();
    let all: Vec<usize> = (0..30).collect();
    let page = to_dynamic(&filled_page(&geom, &all));
    let segmenter = Segmenter::new(geom, SegmenterParams::default());

    let longer = format!("{LETTERS}WXYZWXYZ");
    let report = segmenter.segment_image(&page, &longer);
    assert_eq!(report.candidates.len(), 30);

    let report = segmenter.segment_image(&page, "AB");
    assert_eq!(cell_indices(&report), vec![0, 1]);
    assert_eq!(report.cells_examined, 2);

    let report = segmenter.segment_image(&page, "A C");
    assert_eq!(cell_indices(&report), vec![0, 2]);
    assert_eq!(report.candidates[1].letter, 'C');
}

#[test]
fn unwarped_fallback_keeps_template_cells_on_an_offset_scan() {
    // Without markers the template rectangles are read straight off the scan,
    // even when the scan raster is offset from the template raster.
    let geom = geometry();
    let cell_w = geom.cell_rects[0].width();
    let mut page = filled_page(&geom, &[0]);
    erase_fiducials(&geom, &mut page);

    let mut scan = GrayImage::filled(page.width + cell_w, page.height, 255);
    for y in 0..page.height {
        for x in 0..page.width {
            scan.set(x + cell_w, y, page.get(x, y));
        }
    }

    let segmenter = Segmenter::new(geom, SegmenterParams::default());
    let report = segmenter.segment_image(&to_dynamic(&scan), LETTERS);
    assert_eq!(report.warp, WarpOutcome::FiducialsNotFound);
    assert_eq!(cell_indices(&report), vec![1]);
    assert_eq!(report.candidates[0].letter, 'B');
}

#[test]
fn encoded_scans_and_files() {
    let geom = geometry();
    let cells = mostly_filled();
    let page = filled_page(&geom, &cells);
    let png = encode_png(&page, geom.dpi).expect("encode");
    let segmenter = Segmenter::new(geom.clone(), SegmenterParams::default());

    let report = segmenter.segment_bytes(&png, LETTERS).expect("segment bytes");
    assert_eq!(cell_indices(&report), cells);

    assert!(matches!(
        segmenter.segment_bytes(b"not an image", LETTERS),
        Err(SegmentError::DecodeFailure(_))
    ));

    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("missing.png");
    assert!(matches!(
        segmenter.segment_file(&missing, LETTERS),
        Err(SegmentError::InputNotFound(p)) if p == missing
    ));

    let scan_path = dir.path().join("scan.png");
    std::fs::write(&scan_path, &png).expect("write scan");
    let debug_dir = dir.path().join("debug");
    let report = Segmenter::new(geom, SegmenterParams::default())
        .with_debug_dir(&debug_dir)
        .segment_file(&scan_path, LETTERS)
        .expect("segment file");
    assert_eq!(cell_indices(&report), cells);
    for name in [
        "binarize_gray.png",
        "binarize_clean.png",
        "fiducials.png",
        "warp_page.png",
        "page_mask.png",
    ] {
        assert!(debug_dir.join(name).is_file(), "missing {name}");
    }

    let summary = serde_json::to_value(report.summary()).expect("summary json");
    assert_eq!(summary["warp"]["outcome"], "applied");
    assert_eq!(summary["candidates"][0]["letter"], "A");
    assert_eq!(summary["empty_cells"], BLANK.len());
}
