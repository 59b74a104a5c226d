use pikdraw::{ErrorKind, Flags, PIKCHR_DATE, Rendered, pikchr, try_pikchr};
use regex_lite::Regex;

fn render(source: &str) -> Rendered {
    let out = pikchr(source, None, Flags::PLAINTEXT_ERRORS);
    assert!(!out.is_error(), "{source:?} failed:\n{}", out.markup);
    out
}

fn error(source: &str) -> String {
    let out = pikchr(source, None, Flags::PLAINTEXT_ERRORS);
    assert!(out.is_error(), "{source:?} should fail:\n{}", out.markup);
    assert_eq!((out.width, out.height), (-1, -1));
    out.markup
}

/// The `viewBox` width and height of a rendered diagram.
fn view_box(markup: &str) -> (f64, f64) {
    let re = Regex::new(r#"viewBox="0 0 ([0-9.]+) ([0-9.]+)""#).unwrap();
    let caps = re.captures(markup).expect("no viewBox");
    (caps[1].parse().unwrap(), caps[2].parse().unwrap())
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn single_box_with_text() {
    let out = render(r#"box "Hello""#);
    assert_eq!(out.markup.matches("<path").count(), 1);
    assert_eq!(out.markup.matches("<text").count(), 1);
    assert!(out.markup.contains(">Hello</text>"));
    assert!(out.width > 0 && out.height > 0);
    assert!(out.markup.contains(&format!("data-pikchr-date=\"{PIKCHR_DATE}\"")));
}

#[test]
fn consecutive_boxes_touch() {
    render("box; box; assert(2nd box.w == 1st box.e)");
    render("box; box; assert(2nd box.x == 1st box.x + 0.75)");
}

#[test]
fn percent_distance_scales_default() {
    let out = render("arrow right 200%; assert(last arrow.end == (1, 0)); assert(last arrow.start == (0,0))");
    assert_eq!(out.markup.matches("<polygon").count(), 1);
}

#[test]
fn chained_geometry_assertion_passes() {
    let out = render(r#"box "A"; box "B"; box "C"; assert( 2nd box.x == 1st box.x + 2nd box.wid )"#);
    assert!(!out.markup.contains("ERROR"));
}

#[test]
fn missing_ordinal_class_is_reported() {
    let report = error("circle; circle\nassert( 2nd box.x == 1 )");
    assert!(report.contains("ERROR: no such object"));
}

#[test]
fn lexical_error_has_caret() {
    let report = error("box\n~");
    insta::assert_snapshot!(report, @r"
    /*   1 */  box
    /*   2 */  ~
               ^
    ERROR: unrecognized token
    ");
}

#[test]
fn html_errors_are_wrapped() {
    let out = pikchr("box wid 1 wid 2", None, Flags::empty());
    assert!(out.is_error());
    assert!(out.markup.starts_with("<div><pre>\n"));
    assert!(out.markup.contains("ERROR: value is already set"));
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn rendering_is_idempotent() {
    let source = r#"
        A: box "one" fill lightblue
        arrow right 150% "go" above
        circle "two" fit
        spline from A.s down 0.5 then right 2 then up 0.5 ->
    "#;
    assert_eq!(render(source), render(source));
}

#[test]
fn view_box_covers_bbox_and_margin() {
    let out = render("box wid 1 ht 1");
    let (w, h) = view_box(&out.markup);
    assert!(approx(w, 148.32), "width {w}");
    assert!(approx(h, 148.32), "height {h}");
    assert_eq!((out.width, out.height), (148, 148));

    let out = render("margin = 0.5; box wid 1 ht 1");
    let (w, _) = view_box(&out.markup);
    assert!(approx(w, 292.32), "width {w}");
}

#[test]
fn scale_sets_pixel_size() {
    let out = render("scale = 2; box wid 1 ht 1");
    assert!(out.markup.contains(r#"width="296" height="296""#));
    assert_eq!((out.width, out.height), (296, 296));
    let unscaled = render("scale = 1.005; box wid 1 ht 1");
    assert!(!unscaled.markup.contains("width=\""));
}

#[test]
fn properties_are_set_once() {
    for prop in ["wid", "ht", "rad", "thickness"] {
        let report = error(&format!("box {prop} 1 {prop} 2"));
        assert!(report.contains("ERROR: value is already set"), "{prop}: {report}");
    }
    render("box wid 1; assert(last box.wid == 1)");
}

#[test]
fn only_first_error_is_reported() {
    let report = error("box wid 1 wid 2\ncircle rad 1 rad 2\nline from");
    assert_eq!(report.matches("ERROR:").count(), 1);
    assert!(report.contains("/*   1 */"));
    assert!(!report.contains("/*   2 */"));
}

#[test]
fn macro_matches_inline_text() {
    let inline = render(r#"box "a"; arrow; circle"#);
    let expanded = render("define X { box \"a\"; arrow; circle }\nX");
    assert_eq!(inline.markup, expanded.markup);
}

#[test]
fn macro_arguments_substitute() {
    let inline = render(r#"box "left"; box "right""#);
    let expanded = render("define two { box $1; box $2 }\ntwo(\"left\", \"right\")");
    assert_eq!(inline.markup, expanded.markup);
}

#[test]
fn macro_errors_name_call_site() {
    let report = error("define big { box wid 1 wid 2 }\nbig");
    assert!(report.contains("ERROR: value is already set"));
    assert!(report.contains("Called from:\n/*   2 */  big\n"));
}

#[test]
fn color_names_ignore_case() {
    let red = render("box color red");
    assert_eq!(render("box color Red").markup, red.markup);
    assert_eq!(render("box color RED").markup, red.markup);
    assert!(red.markup.contains("stroke:rgb(255,0,0)"));
}

#[test]
fn units_convert_to_inches() {
    render("assert(1in == 1); assert(2.54cm == 1); assert(25.4mm == 1)");
    render("assert(96px == 1); assert(72pt == 1); assert(6pc == 1)");
}

#[test]
fn empty_document() {
    let out = render("# nothing here\n");
    assert_eq!(out.markup, "<!-- empty pikchr diagram -->\n");
    assert_eq!((out.width, out.height), (0, 0));
}

#[test]
fn print_precedes_svg() {
    let out = render("print \"x =\", 1/4\nbox");
    assert!(out.markup.starts_with("x = 0.25<br>\n<svg"));
}

#[test]
fn class_attribute_on_root() {
    let out = pikchr("box", Some("diagram"), Flags::empty());
    assert!(out.markup.starts_with("<svg xmlns='http://www.w3.org/2000/svg' class=\"diagram\""));
}

#[test]
fn dark_mode_changes_colors() {
    let light = pikchr("box fill white", None, Flags::empty());
    let dark = pikchr("box fill white", None, Flags::DARK_MODE);
    assert_ne!(light.markup, dark.markup);
    assert_eq!((light.width, light.height), (dark.width, dark.height));
}

#[test]
fn two_point_line_ignores_radius() {
    let out = render("line right 1 rad 0.2");
    assert!(out.markup.contains(r#"<path d="M2.16,2.16L146.16,2.16""#), "{}", out.markup);
    assert!(!out.markup.contains(" Q "));

    let bent = render("line right 1 then down 1 rad 0.2");
    assert!(bent.markup.contains(" Q "));
}

#[test]
fn repeated_above_labels_stack_upward() {
    let out = render(r#"line "A" above "B" above "C" above"#);
    let re = Regex::new(r#"<text x="[0-9.]+" y="([0-9.]+)""#).unwrap();
    let ys: Vec<f64> = re
        .captures_iter(&out.markup)
        .map(|c| c[1].parse().unwrap())
        .collect();
    assert_eq!(ys.len(), 3);
    assert!(approx(ys[0], ys[1]), "{ys:?}");
    assert!(ys[2] > ys[0], "{ys:?}");
}

#[test]
fn diagnostics_report_kind() {
    let err = try_pikchr("box; line from 1st circle", None, Flags::empty()).unwrap_err();
    assert_eq!(*err.kind(), ErrorKind::NoSuchObject);
    let err = try_pikchr("box \"open", None, Flags::empty()).unwrap_err();
    assert_eq!(*err.kind(), ErrorKind::UnterminatedString);
}

#[test]
fn syntax_error_at_end_points_past_text() {
    let report = error("box wid");
    let caret = report.lines().nth(1).unwrap();
    assert_eq!(caret.find('^'), Some(18));
    assert!(report.contains("ERROR: syntax error"));
}
