//! Tests for the provider capacity model and geocoding

use udi_engine::algorithm::{CentroidLookup, DiagnosticKind, ProviderSet, effective_capacity};
use udi_engine::{Coordinates, DemandUnit, Provider, UdiConfig};

use crate::utils::{provider, test_config};

#[test]
fn test_capacity_is_always_positive() {
    let config = test_config();
    for practice_type in ["solo", "group", "hospital", "academic", "telehealth"] {
        let p = provider("p").with_practice_type(practice_type);
        let capacity = effective_capacity(&p, &config).expect("located provider");
        assert!(capacity > 0.0, "{practice_type} gave {capacity}");
    }

    // Non-positive explicit values fall back to the modelled capacity
    let p = provider("p").with_capacity(0.0).with_practice_type("hospital");
    assert_eq!(effective_capacity(&p, &config), Ok(60.0));
}

#[test]
fn test_custom_multipliers_from_toml() {
    let config = UdiConfig::from_toml_str(
        r#"
        default_weekly_capacity = 20.0

        [practice_type_multipliers]
        Solo = 2.0
        "#,
    )
    .expect("valid configuration");

    let p = provider("p").with_practice_type("SOLO");
    assert_eq!(effective_capacity(&p, &config), Ok(40.0));
    // Replacing the table drops the default entries
    let p = provider("p").with_practice_type("group");
    assert_eq!(effective_capacity(&p, &config), Ok(20.0));
}

#[test]
fn test_centroid_table_geocodes_providers() {
    let config = test_config();
    let from_demand = Coordinates::new(34.0, -118.0).unwrap();
    let from_table = Coordinates::new(35.0, -119.0).unwrap();

    let demand = vec![DemandUnit::new("90001", 1_000, 0.1).with_centroid(from_demand)];
    let table = vec![
        ("90001".to_string(), from_table),
        ("93001".to_string(), from_table),
    ];
    let lookup = CentroidLookup::new(&demand, &table);
    assert_eq!(lookup.len(), 2);

    let providers = vec![
        Provider::new("a", "cardiology").with_zip("90001"),
        Provider::new("b", "CARDIOLOGY").with_zip("93001"),
        Provider::new("c", "207RC0000X").with_zip("10001"),
    ];
    let set = ProviderSet::build(&providers, &lookup, &config);

    assert_eq!(set.len(), 3);
    assert_eq!(set.get(0).and_then(|p| p.location), Some(from_demand));
    assert_eq!(set.get(1).and_then(|p| p.location), Some(from_table));
    assert_eq!(set.get(2).and_then(|p| p.location), None);
    assert_eq!(set.excluded(), 0);
    assert_eq!(set.diagnostics.len(), 1);
    assert_eq!(set.diagnostics[0].kind, DiagnosticKind::NotGeocoded);
}

#[test]
fn test_unknown_practice_types_are_counted() {
    let config = test_config();
    let providers = vec![
        provider("a").with_practice_type("Mobile"),
        provider("b").with_practice_type("mobile"),
        provider("c").with_practice_type("group"),
    ];
    let set = ProviderSet::build(&providers, &CentroidLookup::default(), &config);
    assert_eq!(set.unknown_practice_types.get("mobile"), Some(&2));
    assert_eq!(set.get(0).map(|p| p.capacity), Some(40.0));
    assert_eq!(set.get(2).map(|p| p.capacity), Some(50.0));
}
