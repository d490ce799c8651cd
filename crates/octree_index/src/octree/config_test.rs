use super::*;

// =========================================================================
// Defaults and validation
// =========================================================================

/// Defaults: capacity 512, 1000³ world at the origin, depth guard on.
#[test]
fn test_defaults() {
  let config = IndexConfig::default();

  assert_eq!(config.capacity, 512);
  assert_eq!(config.world.origin, DVec3::ZERO);
  assert_eq!(config.world.extent, DVec3::splat(1000.0));
  assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
  assert_eq!(config.min_extent, 0.0);
  assert!(config.validate().is_ok());
}

#[test]
fn test_zero_capacity_rejected() {
  let config = IndexConfig {
    capacity: 0,
    ..Default::default()
  };
  assert!(matches!(config.validate(), Err(IndexError::InvalidConfig(_))));
}

#[test]
fn test_unaddressable_depth_rejected() {
  let config = IndexConfig::default().with_max_depth(NodeKey::MAX_DEPTH + 1);
  assert!(matches!(config.validate(), Err(IndexError::InvalidConfig(_))));

  let config = IndexConfig::default().with_max_depth(NodeKey::MAX_DEPTH);
  assert!(config.validate().is_ok());
}

#[test]
fn test_bad_min_extent_rejected() {
  for min_extent in [-1.0, f64::NAN, f64::INFINITY] {
    let config = IndexConfig::default().with_min_extent(min_extent);
    assert!(
      matches!(config.validate(), Err(IndexError::InvalidConfig(_))),
      "min_extent {min_extent} should be rejected"
    );
  }
}

/// A world built without `Region::new` is still checked.
#[test]
fn test_degenerate_world_rejected() {
  let config = IndexConfig {
    world: Region {
      origin: DVec3::ZERO,
      extent: DVec3::new(10.0, 0.0, 10.0),
    },
    ..Default::default()
  };
  assert!(matches!(config.validate(), Err(IndexError::InvalidRegion { .. })));
}

// =========================================================================
// Depth guard
// =========================================================================

#[test]
fn test_allows_split_below_max_depth() {
  let config = IndexConfig::default().with_max_depth(3);
  let region = config.world;

  assert!(config.allows_split(0, &region));
  assert!(config.allows_split(2, &region));
  assert!(!config.allows_split(3, &region), "depth 3 children would be depth 4");
  assert!(!config.allows_split(10, &region));
}

/// min_extent compares against the smallest axis of the would-be child.
#[test]
fn test_allows_split_respects_min_extent() {
  let config = IndexConfig::default().with_min_extent(2.0);

  let wide = Region::new(DVec3::ZERO, DVec3::new(100.0, 4.0, 100.0)).unwrap();
  let thin = Region::new(DVec3::ZERO, DVec3::new(100.0, 3.0, 100.0)).unwrap();

  assert!(config.allows_split(0, &wide), "child y extent 2.0 is allowed");
  assert!(!config.allows_split(0, &thin), "child y extent 1.5 is too small");
}

/// Halving the smallest subnormal extent rounds to zero; that split is refused
/// even with the extent floor disabled.
#[test]
fn test_allows_split_refuses_zero_extent_children() {
  let config = IndexConfig::default().with_max_depth(NodeKey::MAX_DEPTH);
  assert_eq!(config.min_extent, 0.0);

  let smallest = Region::cube(DVec3::ZERO, f64::from_bits(1)).unwrap();
  let next = Region::cube(DVec3::ZERO, f64::from_bits(2)).unwrap();

  assert!(!config.allows_split(0, &smallest));
  assert!(config.allows_split(0, &next));
}

#[cfg(feature = "serde")]
#[test]
fn test_deserialize_partial_config() {
  let config: IndexConfig = serde_json::from_str(
    r#"{ "capacity": 8, "world": { "origin": [-4.0, -4.0, -4.0], "extent": [8.0, 8.0, 8.0] } }"#,
  )
  .unwrap();

  assert_eq!(config.capacity, 8);
  assert_eq!(config.world.origin, DVec3::splat(-4.0));
  assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
}

#[cfg(feature = "serde")]
#[test]
fn test_deserialize_rejects_invalid_world() {
  let result: Result<IndexConfig, _> =
    serde_json::from_str(r#"{ "world": { "origin": [0.0, 0.0, 0.0], "extent": [8.0, -1.0, 8.0] } }"#);
  assert!(result.is_err());
}
