//! End-to-end behavior of the optimizer through the public API.

use svgsqueeze::{
    Config, Info, Optimizer, PathFormat, PluginConfig, intersects, optimize, parse_path, parse_svg, serialize_path,
};

fn run_plugins(svg: &str, plugins: &[&str]) -> String {
    let config = Config {
        plugins: plugins.iter().map(|&name| PluginConfig::new(name)).collect(),
        ..Config::default()
    };
    let optimizer = Optimizer::new(config).unwrap();
    optimizer.optimize(svg, Info::default()).unwrap().data
}

fn inline(svg: &str) -> String {
    run_plugins(svg, &["inline_styles"])
}

#[test]
fn test_important_sheet_rule_beats_inline_style() {
    assert_eq!(
        inline(r#"<svg><style>rect{color:blue!important}</style><rect style="color:red"/></svg>"#),
        r#"<svg><rect style="color:blue!important"/></svg>"#
    );
}

#[test]
fn test_important_inline_style_beats_sheet_rule() {
    assert_eq!(
        inline(r#"<svg><style>rect{color:blue}</style><rect style="color:red!important"/></svg>"#),
        r#"<svg><rect style="color:red!important"/></svg>"#
    );
}

#[test]
fn test_matched_class_removed_from_list() {
    assert_eq!(
        inline(r#"<svg><style>.a{color:red}</style><rect class="a b"/></svg>"#),
        r#"<svg><rect class="b" style="color:red"/></svg>"#
    );
    assert_eq!(
        inline(r#"<svg><style>.a{color:red}</style><rect class="a"/></svg>"#),
        r#"<svg><rect style="color:red"/></svg>"#
    );
}

#[test]
fn test_emptied_media_block_removed() {
    assert_eq!(
        inline(r#"<svg><style>@media screen{.a{fill:red}}.z{fill:blue}</style><rect class="a"/></svg>"#),
        r#"<svg><style>.z{fill:blue}</style><rect style="fill:red"/></svg>"#
    );
}

#[test]
fn test_emptied_style_element_spliced_out() {
    assert_eq!(
        inline(r#"<svg><rect class="a"/><style>.a{fill:red}</style><circle/></svg>"#),
        r#"<svg><rect style="fill:red"/><circle/></svg>"#
    );
}

#[test]
fn test_inlined_styles_reach_later_plugins() {
    // once inlined, the two paths share attributes and can merge
    let svg = r#"<svg><style>#a{fill:red}#b{fill:red}</style><path id="a" d="M0 0h1v1H0z"/><path id="b" d="M5 5h1v1H5z"/></svg>"#;
    assert_eq!(
        run_plugins(svg, &["inline_styles", "merge_paths"]),
        r#"<svg><path d="M0 0h1v1H0zM5 5h1v1H5z" style="fill:red"/></svg>"#
    );
}

#[test]
fn test_inlined_group_style_not_overridden_by_hoisting() {
    let svg = r#"<svg><style>g{fill:blue}</style><g><rect fill="red"/><circle fill="red"/></g></svg>"#;
    assert_eq!(
        run_plugins(svg, &["inline_styles", "move_elems_attrs_to_group"]),
        r#"<svg><g style="fill:blue"><rect fill="red"/><circle fill="red"/></g></svg>"#
    );
}

#[test]
fn test_default_preset_end_to_end() {
    let svg = r##"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">
<!-- Generator: some editor -->
<svg xmlns="http://www.w3.org/2000/svg" version="1.1" viewBox="0 0 100 100">
    <title>icon</title>
    <g>
        <g fill="#FF0000">
            <path d="M 10.00001 10 L 20 10 L 20 20 Z"/>
            <path d="M 50 50 L 60 50 L 60 60 Z"/>
        </g>
    </g>
</svg>"##;
    assert_eq!(
        optimize(svg).unwrap(),
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100"><g fill="red"><path d="M10 10 20 10 20 20ZM50 50 60 50 60 60Z"/></g></svg>"#
    );

    // the group left behind by merging collapses on the next cycle
    let config = Config {
        multipass: true,
        ..Config::default()
    };
    let output = Optimizer::new(config).unwrap().optimize(svg, Info::default()).unwrap();
    assert_eq!(
        output.data,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100"><path d="M10 10 20 10 20 20ZM50 50 60 50 60 60Z" fill="red"/></svg>"#
    );
    assert_eq!(output.passes, 3);
}

#[test]
fn test_multipass_output_is_stable() {
    let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><g><g><g fill="red"><rect width="1"/><circle r="1"/></g></g></g><defs><g/></defs></svg>"#;
    let config = Config {
        multipass: true,
        ..Config::default()
    };
    let optimizer = Optimizer::new(config).unwrap();
    let first = optimizer.optimize(svg, Info::default()).unwrap();
    assert!(first.passes >= 1 && first.passes <= 10);

    let again = optimizer.optimize(&first.data, Info::default()).unwrap();
    assert!(again.data.len() >= first.data.len());
    assert_eq!(again.data, first.data);
}

#[test]
fn test_path_text_round_trips_numerically() {
    let format = PathFormat::default();
    for d in [
        "M10 20L30 40",
        "M.5.5l-.25-.25",
        "M0 0A10 10 0 0 1 20 20",
        "m1 2c3 4 5 6 7 8s9 10 11 12zM-1-2q3 4 5 6t7 8",
        "M1e2 2.5e-1H-3V4.125",
    ] {
        let parsed = parse_path(d).unwrap();
        let reparsed = parse_path(&serialize_path(&parsed, &format)).unwrap();
        let args = |p: &svgsqueeze::PathData| p.commands.iter().flat_map(|c| c.args.clone()).collect::<Vec<_>>();
        assert_eq!(args(&parsed), args(&reparsed), "{d}");
    }
}

#[test]
fn test_intersection_predicate_is_conservative() {
    let overlapping = [
        ("M0 0h10v10H0z", "M5 5h10v10H5z"),
        ("M0 0h10v10H0z", "M2 2h2v2H2z"),
        ("M0 0L10 10L0 10z", "M0 9h3v3H0z"),
        ("M0 5A5 5 0 0 1 10 5", "M4 0h2v2H4z"),
    ];
    for (a, b) in overlapping {
        assert!(intersects(&parse_path(a).unwrap(), &parse_path(b).unwrap()), "{a} / {b}");
    }

    let disjoint = [
        ("M0 0h10v10H0z", "M20 0h10v10H20z"),
        ("M0 0L10 0L0 10z", "M10 10h5v5H10z"),
    ];
    for (a, b) in disjoint {
        assert!(!intersects(&parse_path(a).unwrap(), &parse_path(b).unwrap()), "{a} / {b}");
    }
}

#[test]
fn test_markup_errors_are_fatal() {
    assert!(optimize("<svg><g></svg>").is_err());
    assert!(parse_svg("not svg").is_err());
}

#[tokio::test]
async fn test_optimize_async_matches_sync() {
    let optimizer = Optimizer::new(Config::default()).unwrap();
    let svg = r#"<svg><!-- c --><g><rect/></g></svg>"#;
    let sync = optimizer.optimize(svg, Info::default()).unwrap();
    let async_output = optimizer.optimize_async(svg, Info::default()).await.unwrap();
    assert_eq!(sync, async_output);
    assert_eq!(async_output.data, "<svg><rect/></svg>");
}
