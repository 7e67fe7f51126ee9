mod common;

use common::{file_mod, imc, imc_defaults, meta_mod, path, payload, Fixture, IMC_PATH};
use modcache::model::ModSettings;
use modcache::CollectionCache;
use modcache_core::{ModKey, Payload, SyntheticPath};
use modcache_meta::{EquipSlot, ImcFile, Variant};

fn published(cache: &CollectionCache) -> SyntheticPath {
    match cache.resolve(&path(IMC_PATH)) {
        Some(Payload::Synthetic(synthetic)) => synthetic.clone(),
        other => panic!("expected a synthetic file, got {:?}", other),
    }
}

fn material(cache: &CollectionCache, synthetic: &SyntheticPath, slot: EquipSlot) -> u8 {
    let bytes = cache.meta().synthetic_file(synthetic).unwrap();
    let file = ImcFile::parse(&bytes).unwrap();
    file.entry(Variant(1), slot.position()).unwrap().material_id
}

#[test]
fn test_imc_edits_publish_synthetic_file() {
    let mut fx = Fixture::new().with_defaults(imc_defaults());
    let head = fx.add(meta_mod("head", &[imc(EquipSlot::Head, 5)]), 0);
    let body = fx.add(meta_mod("body", &[imc(EquipSlot::Body, 6)]), 0);
    let view = fx.storage.view(fx.collection).unwrap();
    let mut cache = fx.cache();

    cache.add_mod(&view, head).unwrap();
    let first = published(&cache);
    assert_eq!(first.path, path(IMC_PATH));
    assert_eq!(&*first.collection, "Default");
    assert_eq!(cache.resolved_entry(&path(IMC_PATH)).unwrap().owner, ModKey::Forced);
    assert_eq!(material(&cache, &first, EquipSlot::Head), 5);

    cache.add_mod(&view, body).unwrap();
    let second = published(&cache);
    assert!(second.counter > first.counter);
    assert!(cache.meta().synthetic_file(&first).is_none());
    assert_eq!(material(&cache, &second, EquipSlot::Head), 5);
    assert_eq!(material(&cache, &second, EquipSlot::Body), 6);

    cache.remove_mod(&view, head);
    let third = published(&cache);
    assert!(third.counter > second.counter);
    assert_eq!(material(&cache, &third, EquipSlot::Head), 0);

    cache.remove_mod(&view, body);
    assert!(cache.resolve(&path(IMC_PATH)).is_none());
    assert!(cache.meta().imc_file(&path(IMC_PATH)).is_none());
    assert!(cache.meta().synthetic_file(&third).is_none());
    assert!(cache.owned_by(ModKey::Forced).is_none());
}

#[test]
fn test_reverting_imc_edit_restores_mod_file() {
    let mut fx = Fixture::new().with_defaults(imc_defaults());
    let files = fx.add(file_mod("files", &[IMC_PATH]), 1);
    let edit = fx.add(meta_mod("imc", &[imc(EquipSlot::Head, 5)]), 2);
    let view = fx.storage.view(fx.collection).unwrap();
    let mut cache = fx.cache();

    cache.add_mod(&view, files).unwrap();
    cache.add_mod(&view, edit).unwrap();
    assert_eq!(cache.resolved_entry(&path(IMC_PATH)).unwrap().owner, ModKey::Forced);
    assert!(cache.owned_by(files).is_none());

    fx.set(edit, ModSettings::default());
    let view = fx.storage.view(fx.collection).unwrap();
    cache.remove_mod(&view, edit);

    let entry = cache.resolved_entry(&path(IMC_PATH)).unwrap();
    assert_eq!(entry.owner, files);
    assert_eq!(entry.payload, payload("files", IMC_PATH));
    assert_eq!(cache.snapshot().files, fx.recalculated().snapshot().files);
}

#[test]
fn test_forced_file_sits_above_published_file() {
    let mut fx = Fixture::new().with_defaults(imc_defaults());
    let edit = fx.add(meta_mod("imc", &[imc(EquipSlot::Head, 5)]), 0);
    let view = fx.storage.view(fx.collection).unwrap();
    let mut cache = fx.cache();
    cache.add_mod(&view, edit).unwrap();

    let forced = Payload::real("/override/e0001.imc");
    cache.force_file(&view, path(IMC_PATH), Some(forced.clone()));
    assert_eq!(cache.resolve(&path(IMC_PATH)), Some(&forced));

    cache.reload_mod(&view, edit).unwrap();
    assert_eq!(cache.resolve(&path(IMC_PATH)), Some(&forced));

    cache.force_file(&view, path(IMC_PATH), None);
    let synthetic = published(&cache);
    assert_eq!(material(&cache, &synthetic, EquipSlot::Head), 5);
}
