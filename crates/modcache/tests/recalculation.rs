mod common;

use common::{eqdp, imc, imc_defaults, path, payload, shape, shape_name, visor, Fixture, IMC_PATH};
use modcache::context::ModContext;
use modcache::model::{Mod, ModOption, ModSettings};
use modcache::{CacheSnapshot, CollectionCache};
use modcache_core::{ModKey, Payload, SyntheticPath};
use modcache_meta::{
    EquipSlot, GenderRace, HumanSlot, PrimaryId, ShapeConnectorCondition, TableKey,
};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

const FILES: [&str; 4] = ["a.tex", "b.tex", "c.mdl", IMC_PATH];

#[derive(Debug, Clone)]
struct ModShape {
    files: Vec<usize>,
    visor: Option<bool>,
    eqdp: Option<bool>,
    shape: Option<bool>,
    imc: Option<(bool, u8)>,
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Enable(usize),
    Disable(usize),
    Reload(usize),
    Force(usize),
    Unforce(usize),
}

fn mod_shape() -> impl Strategy<Value = ModShape> {
    (
        prop::collection::btree_set(0..FILES.len(), 0..=FILES.len()),
        prop::option::of(any::<bool>()),
        prop::option::of(any::<bool>()),
        prop::option::of(any::<bool>()),
        prop::option::of((any::<bool>(), 1u8..4)),
    )
        .prop_map(|(files, visor, eqdp, shape, imc)| ModShape {
            files: files.into_iter().collect(),
            visor,
            eqdp,
            shape,
            imc,
        })
}

fn op(mods: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..mods).prop_map(Op::Enable),
        3 => (0..mods).prop_map(Op::Disable),
        2 => (0..mods).prop_map(Op::Reload),
        1 => (0..FILES.len()).prop_map(Op::Force),
        1 => (0..FILES.len()).prop_map(Op::Unforce),
    ]
}

fn build(index: usize, shape_of: &ModShape) -> Mod {
    let name = format!("m{}", index);
    let mut option = ModOption::new("Default");
    for &file in &shape_of.files {
        option = option.with_file(path(FILES[file]), payload(&name, FILES[file]));
    }
    if let Some(shown) = shape_of.visor {
        option = option.with_manipulation(visor(shown));
    }
    if let Some(material) = shape_of.eqdp {
        option = option.with_manipulation(eqdp(material));
    }
    if let Some(enabled) = shape_of.shape {
        option = option.with_manipulation(shape(enabled));
    }
    if let Some((head, material)) = shape_of.imc {
        let slot = if head { EquipSlot::Head } else { EquipSlot::Body };
        option = option.with_manipulation(imc(slot, material));
    }
    Mod::new(name).with_default_option(option)
}

fn forced_payload(file: usize) -> Payload {
    Payload::real(format!("/forced/{}", FILES[file]))
}

/// Synthetic counters differ between runs; only the instance identity matters.
fn without_counter(payload: &Payload) -> Payload {
    match payload {
        Payload::Synthetic(synthetic) => Payload::Synthetic(SyntheticPath::new(
            synthetic.collection.clone(),
            0,
            synthetic.path.clone(),
        )),
        other => other.clone(),
    }
}

fn comparable(snapshot: CacheSnapshot) -> CacheSnapshot {
    let mut snapshot = snapshot;
    for entry in snapshot.files.values_mut() {
        entry.payload = without_counter(&entry.payload);
    }
    snapshot.manipulations.sort();
    snapshot.conflicts.clear();
    snapshot
}

/// Everything tables and per-instance files expose to the host.
fn meta_state(cache: &CollectionCache) -> Vec<String> {
    let meta = cache.meta();
    let mut state: Vec<String> = TableKey::all()
        .map(|key| format!("{:?}: {:?}", key, meta.effective_table_bytes(key)))
        .collect();
    state.push(format!("imc: {:?}", meta.imc_file(&path(IMC_PATH))));
    state.push(format!(
        "shape: {:?}",
        meta.shape_state(
            HumanSlot::Head,
            Some(PrimaryId(1)),
            &shape_name(),
            GenderRace::Unknown,
            ShapeConnectorCondition::None,
        )
    ));
    state
}

/// Run `ops` incrementally, then build the same collection by one full recalculation.
fn run(
    shapes: &[ModShape],
    priorities: &[i32],
    ops: &[Op],
) -> (Fixture, CollectionCache, CollectionCache) {
    let mut fx = Fixture::new().with_defaults(imc_defaults());
    let keys: Vec<ModKey> = shapes
        .iter()
        .enumerate()
        .map(|(index, shape_of)| {
            let key = fx.storage.mods.insert(build(index, shape_of));
            fx.set(key, ModSettings { priority: priorities[index], ..ModSettings::default() });
            key
        })
        .collect();

    let mut cache = fx.cache();
    let mut forced = BTreeSet::new();
    for op in ops {
        match *op {
            Op::Enable(i) if i < keys.len() => {
                fx.set(keys[i], ModSettings::enabled(priorities[i]));
                let view = fx.storage.view(fx.collection).unwrap();
                cache.add_mod(&view, keys[i]).unwrap();
            }
            Op::Disable(i) if i < keys.len() => {
                fx.set(keys[i], ModSettings { priority: priorities[i], ..ModSettings::default() });
                let view = fx.storage.view(fx.collection).unwrap();
                cache.remove_mod(&view, keys[i]);
            }
            Op::Reload(i) if i < keys.len() => {
                let view = fx.storage.view(fx.collection).unwrap();
                cache.reload_mod(&view, keys[i]).unwrap();
            }
            Op::Force(file) => {
                let view = fx.storage.view(fx.collection).unwrap();
                cache.force_file(&view, path(FILES[file]), Some(forced_payload(file)));
                forced.insert(file);
            }
            Op::Unforce(file) => {
                let view = fx.storage.view(fx.collection).unwrap();
                cache.force_file(&view, path(FILES[file]), None);
                forced.remove(&file);
            }
            _ => {}
        }
    }

    let view = fx.storage.view(fx.collection).unwrap();
    let mut full = fx.cache();
    for file in &forced {
        full.force_file(&view, path(FILES[*file]), Some(forced_payload(*file)));
    }
    full.full_recalculation(&view);
    (fx, cache, full)
}

/// Per path and per identifier, the priority of whoever wins it.
fn winners(
    fx: &Fixture,
    snapshot: &CacheSnapshot,
) -> (BTreeMap<String, (i32, Option<Payload>)>, BTreeMap<String, i32>) {
    let view = fx.storage.view(fx.collection).unwrap();
    let files = snapshot
        .files
        .iter()
        .map(|(path, entry)| {
            // Payloads only identify the winner when it is a forced file.
            let payload = match entry.owner {
                ModKey::Forced => Some(without_counter(&entry.payload)),
                _ => None,
            };
            (path.to_string(), (view.priority(entry.owner), payload))
        })
        .collect();
    let manipulations = snapshot
        .manipulations
        .iter()
        .map(|(identifier, owner)| (identifier.clone(), view.priority(*owner)))
        .collect();
    (files, manipulations)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_incremental_matches_full_recalculation(
        shapes in prop::collection::vec(mod_shape(), 2..5),
        priorities in Just((0..5).collect::<Vec<i32>>()).prop_shuffle(),
        ops in prop::collection::vec(op(4), 0..32),
    ) {
        let (_fx, cache, full) = run(&shapes, &priorities, &ops);
        prop_assert_eq!(comparable(cache.snapshot()), comparable(full.snapshot()));
        prop_assert_eq!(meta_state(&cache), meta_state(&full));
    }

    #[test]
    fn test_tied_priorities_keep_the_highest_winner(
        shapes in prop::collection::vec(mod_shape(), 2..5),
        priorities in prop::collection::vec(0..2i32, 4),
        ops in prop::collection::vec(op(4), 0..32),
    ) {
        let (fx, cache, full) = run(&shapes, &priorities, &ops);
        let incremental = cache.snapshot();
        let recalculated = full.snapshot();
        prop_assert_eq!(
            incremental.files.keys().collect::<Vec<_>>(),
            recalculated.files.keys().collect::<Vec<_>>()
        );
        prop_assert_eq!(winners(&fx, &incremental), winners(&fx, &recalculated));
    }

    #[test]
    fn test_add_then_remove_restores_state(
        shapes in prop::collection::vec(mod_shape(), 2..5),
        priorities in Just((0..5).collect::<Vec<i32>>()).prop_shuffle(),
    ) {
        let mut fx = Fixture::new().with_defaults(imc_defaults());
        let keys: Vec<ModKey> = shapes
            .iter()
            .enumerate()
            .map(|(index, shape_of)| fx.add(build(index, shape_of), priorities[index]))
            .collect();
        let (last, rest) = keys.split_last().unwrap();

        let mut cache = fx.cache();
        let view = fx.storage.view(fx.collection).unwrap();
        for key in rest {
            cache.add_mod(&view, *key).unwrap();
        }
        let before = comparable(cache.snapshot());
        let before_meta = meta_state(&cache);

        cache.add_mod(&view, *last).unwrap();
        cache.remove_mod(&view, *last);
        prop_assert_eq!(comparable(cache.snapshot()), before);
        prop_assert_eq!(meta_state(&cache), before_meta);
    }
}
