use irrigation_dashboard::status::{
    DEFAULT_COLOR, Palette, ProjectStatus, StatusNormalizer, UnmatchedStatus, default_rules,
    normalize_status,
};
use proptest::prelude::*;

#[test]
fn rule_order_is_part_of_the_contract() {
    let cases = [
        ("Nearly Completed", ProjectStatus::NearlyCompleted),
        ("Completed", ProjectStatus::Completed),
        ("Under Construction", ProjectStatus::UnderConstruction),
        ("Under Progress", ProjectStatus::UnderProgress),
        ("Work in progress", ProjectStatus::UnderProgress),
        ("Ongoing", ProjectStatus::Ongoing),
        ("Planned", ProjectStatus::Planned),
        ("Approved", ProjectStatus::Approved),
        ("", ProjectStatus::Unknown),
    ];
    for (raw, expected) in cases {
        assert_eq!(normalize_status(raw), expected, "status {raw:?}");
    }
}

#[test]
fn earlier_rules_shadow_later_ones() {
    // "complete" precedes "under construction" and "approved".
    assert_eq!(
        normalize_status("Approved, construction complete"),
        ProjectStatus::Completed
    );
    assert_eq!(
        normalize_status("Approved - under construction"),
        ProjectStatus::UnderConstruction
    );
    assert_eq!(
        normalize_status("Ongoing (progress slow)"),
        ProjectStatus::UnderProgress
    );
}

#[test]
fn default_palette_matches_dashboard_colors() {
    let palette = Palette::default();
    assert_eq!(palette.color_for(&ProjectStatus::Completed), "#10b981");
    assert_eq!(palette.color_for(&ProjectStatus::Ongoing), "#f59e0b");
    assert_eq!(palette.color_for(&ProjectStatus::UnderConstruction), "#f97316");
    assert_eq!(palette.color_for(&ProjectStatus::UnderProgress), "#f97316");
    assert_eq!(palette.color_for(&ProjectStatus::Planned), "#6366f1");
    assert_eq!(palette.color_for(&ProjectStatus::Approved), "#8b5cf6");
    assert_eq!(palette.color_for(&ProjectStatus::NearlyCompleted), "#f59e0b");
    assert_eq!(palette.color_for(&ProjectStatus::Unknown), DEFAULT_COLOR);
}

proptest! {
    #[test]
    fn normalization_is_idempotent(raw in "[A-Za-z ,()-]{0,40}") {
        let once = normalize_status(&raw);
        let twice = normalize_status(once.label());
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn unknown_policy_only_yields_canonical_statuses(raw in "\\PC{0,30}") {
        let strict = StatusNormalizer::new(default_rules(), UnmatchedStatus::Unknown);
        prop_assert!(strict.normalize(Some(&raw)).is_canonical());
    }
}
