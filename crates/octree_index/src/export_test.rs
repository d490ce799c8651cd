use super::*;

fn index_with(points: &[DVec3]) -> SpatialIndex<usize> {
  let world = Region::cube(DVec3::ZERO, 8.0).unwrap();
  let mut index = SpatialIndex::with_capacity(world, 2).unwrap();
  for (id, &position) in points.iter().enumerate() {
    index.insert(position, id).unwrap();
  }
  index
}

const RED: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);
const BLUE: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0);

fn red_blue(policy: OverlapPolicy) -> ColorTable {
  ColorTable::new(vec![ColorBand::new(0.0, 0.6, RED), ColorBand::new(0.4, 1.0, BLUE)])
    .with_policy(policy)
}

// =========================================================================
// ColorTable
// =========================================================================

#[test]
fn test_band_bounds_are_inclusive() {
  let band = ColorBand::new(0.2, 0.4, RED);
  assert!(band.contains(0.2));
  assert!(band.contains(0.4));
  assert!(!band.contains(0.1999));
  assert!(!band.contains(0.4001));
}

#[test]
fn test_first_policy_is_default() {
  assert_eq!(ColorTable::terrain().policy(), OverlapPolicy::First);
  assert_eq!(red_blue(OverlapPolicy::default()).classify(0.5), RED);
}

#[test]
fn test_overlap_policies() {
  assert_eq!(red_blue(OverlapPolicy::First).classify(0.5), RED);
  assert_eq!(red_blue(OverlapPolicy::Last).classify(0.5), BLUE);
  assert_eq!(
    red_blue(OverlapPolicy::Blend).classify(0.5),
    Vec4::new(0.5, 0.0, 0.5, 1.0)
  );

  // Outside the overlap every policy agrees.
  for policy in [OverlapPolicy::First, OverlapPolicy::Last, OverlapPolicy::Blend] {
    assert_eq!(red_blue(policy).classify(0.1), RED);
    assert_eq!(red_blue(policy).classify(0.9), BLUE);
  }
}

#[test]
fn test_unmatched_value_uses_fallback() {
  let table = red_blue(OverlapPolicy::Blend).with_fallback(Vec4::ZERO);
  assert_eq!(table.classify(1.5), Vec4::ZERO);
  assert_eq!(red_blue(OverlapPolicy::First).classify(-0.1), DEFAULT_FALLBACK);
}

/// The terrain table covers [0, 1] and overlaps where layers meet.
#[test]
fn test_terrain_table_layers() {
  let table = ColorTable::terrain();
  assert_eq!(table.bands().len(), 9);

  for step in 0..=100 {
    let value = step as f64 / 100.0;
    assert!(table.matches(value).next().is_some(), "{value} not covered");
  }

  // Obsidian wins over water at the very bottom; water and sand overlap at 0.12.
  assert_eq!(table.classify(0.0), TERRAIN_BANDS[0].color);
  assert_eq!(table.matches(0.12).count(), 2);
  assert_eq!(table.classify(0.97), TERRAIN_BANDS[8].color);
}

// =========================================================================
// Exporter
// =========================================================================

#[test]
fn test_export_empty_index() {
  let index = index_with(&[]);
  let cloud = PointCloudExporter::default().export(&index, |_| 0.5);
  assert!(cloud.is_empty());
}

/// One point per entry, every point at its leaf's anchor.
#[test]
fn test_export_places_points_at_leaf_anchor() {
  let index = index_with(&[DVec3::splat(1.0), DVec3::splat(2.0), DVec3::splat(6.0)]);

  let origin = PointCloudExporter::default().export(&index, |_| 0.5);
  let mut anchors = origin.positions.clone();
  anchors.sort_by(|a, b| a.x.total_cmp(&b.x));
  assert_eq!(origin.len(), 3);
  assert_eq!(origin.colors.len(), 3);
  assert_eq!(anchors, vec![Vec3::ZERO, Vec3::ZERO, Vec3::splat(4.0)]);

  let center = PointCloudExporter::default()
    .with_anchor(Anchor::Center)
    .export(&index, |_| 0.5);
  assert!(center.positions.contains(&Vec3::splat(2.0)));
  assert!(center.positions.contains(&Vec3::splat(6.0)));
}

#[test]
fn test_export_uses_classification() {
  let index = index_with(&[DVec3::splat(1.0), DVec3::splat(6.0)]);
  let exporter = PointCloudExporter::new(red_blue(OverlapPolicy::First));

  let cloud = exporter.export(&index, |entry| if entry.payload == 0 { 0.1 } else { 0.9 });

  // Both entries fit in the root leaf and come out in insertion order.
  assert_eq!(cloud.colors, vec![RED, BLUE]);
}

#[test]
fn test_export_by_height() {
  let index = index_with(&[DVec3::new(1.0, 1.0, 1.0), DVec3::new(1.0, 7.0, 1.0), DVec3::splat(6.0)]);
  let exporter = PointCloudExporter::new(red_blue(OverlapPolicy::First));

  let cloud = exporter.export_by_height(&index);

  // Origin anchors: y = 0 for octant 0, y = 4 (0.5) for octants 2 and 7.
  assert_eq!(cloud.len(), 3);
  assert_eq!(cloud.colors[0], RED);
  assert_eq!(cloud.colors[1], RED, "0.5 is in both bands, first match wins");
}

/// Height comes from each leaf's own anchor, so the anchor choice moves it.
#[test]
fn test_export_by_height_follows_anchor() {
  let index = index_with(&[DVec3::new(1.0, 1.0, 1.0), DVec3::new(1.0, 7.0, 1.0), DVec3::splat(6.0)]);
  let exporter = PointCloudExporter::new(red_blue(OverlapPolicy::First)).with_anchor(Anchor::Center);

  let cloud = exporter.export_by_height(&index);

  // Center anchors: y = 2 (0.25) for octant 0, y = 6 (0.75) for octants 2 and 7.
  assert_eq!(cloud.colors, vec![RED, BLUE, BLUE]);
  assert_eq!(cloud.positions[0], Vec3::splat(2.0));
}

#[test]
fn test_normalized_height_clamps() {
  let world = Region::new(DVec3::new(0.0, -10.0, 0.0), DVec3::new(1.0, 20.0, 1.0)).unwrap();
  assert_eq!(normalized_height(&world, DVec3::new(0.0, -10.0, 0.0)), 0.0);
  assert_eq!(normalized_height(&world, DVec3::new(0.0, 0.0, 0.0)), 0.5);
  assert_eq!(normalized_height(&world, DVec3::new(0.0, 50.0, 0.0)), 1.0);
}
