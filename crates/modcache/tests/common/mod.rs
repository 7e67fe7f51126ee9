#![allow(dead_code)]

use modcache::model::{Mod, ModOption, ModSettings};
use modcache::{CollectionCache, Storage};
use modcache_core::{CollectionId, ModKey, Payload, VirtualPath};
use modcache_meta::{
    BaseTables, EqdpEntry, EqdpIdentifier, EqpEntry, EqpIdentifier, EquipSlot, GenderRace,
    HumanSlot, ImcEntry, ImcFile, ImcIdentifier, MetaManipulation, ObjectType, PrimaryId,
    SecondaryId, ShapeAttributeName, ShapeConnectorCondition, ShpEntry, ShpIdentifier,
    TableSpace, Variant,
};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Route library logs to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn path(s: &str) -> VirtualPath {
    VirtualPath::new(s).unwrap()
}

pub fn payload(owner: &str, file: &str) -> Payload {
    Payload::real(format!("/mods/{}/{}", owner, file))
}

/// Eqp record of set 1, head slot, with the visor shown or hidden.
pub fn visor(shown: bool) -> MetaManipulation {
    let entry = if shown {
        EqpEntry::DEFAULT | EqpEntry::HEAD_USE_VISOR
    } else {
        EqpEntry::DEFAULT - EqpEntry::HEAD_USE_VISOR
    };
    MetaManipulation::Eqp(
        EqpIdentifier {
            set_id: PrimaryId(1),
            slot: EquipSlot::Head,
        },
        entry,
    )
}

/// Per-instance file of equipment set 1.
pub const IMC_PATH: &str = "chara/equipment/e0001/e0001.imc";

/// Base data with a five-part, one-variant file at [`IMC_PATH`].
pub fn imc_defaults() -> BaseTables {
    BaseTables::new().with_imc_file(path(IMC_PATH), ImcFile::new(0x1F, 1, ImcEntry::default()))
}

/// Variant 1 of equipment set 1 with the given material for one slot.
pub fn imc(slot: EquipSlot, material: u8) -> MetaManipulation {
    MetaManipulation::Imc(
        ImcIdentifier {
            object_type: ObjectType::Equipment,
            primary_id: PrimaryId(1),
            secondary_id: SecondaryId(0),
            variant: Variant(1),
            slot,
        },
        ImcEntry {
            material_id: material,
            ..ImcEntry::default()
        },
    )
}

/// Head deformation record of set 1 for midlander males.
pub fn eqdp(material: bool) -> MetaManipulation {
    MetaManipulation::Eqdp(
        EqdpIdentifier {
            set_id: PrimaryId(1),
            slot: EquipSlot::Head,
            gender_race: GenderRace::MidlanderMale,
        },
        EqdpEntry::from_slot(EquipSlot::Head, material, !material),
    )
}

pub fn shape_name() -> ShapeAttributeName {
    ShapeAttributeName::new("shp_hair").unwrap()
}

/// Shape toggle on the head of set 1.
pub fn shape(enabled: bool) -> MetaManipulation {
    MetaManipulation::Shp(
        ShpIdentifier {
            slot: HumanSlot::Head,
            id: Some(PrimaryId(1)),
            shape: shape_name(),
            gender_race: GenderRace::Unknown,
            connector: ShapeConnectorCondition::None,
        },
        ShpEntry(enabled),
    )
}

pub fn meta_mod(name: &str, manipulations: &[MetaManipulation]) -> Mod {
    let option = manipulations
        .iter()
        .fold(ModOption::new("Default"), |option, manipulation| {
            option.with_manipulation(manipulation.clone())
        });
    Mod::new(name).with_default_option(option)
}

pub fn file_mod(name: &str, files: &[&str]) -> Mod {
    let option = files
        .iter()
        .fold(ModOption::new("Default"), |option, file| {
            option.with_file(path(file), payload(name, file))
        });
    Mod::new(name).with_default_option(option)
}

pub struct Fixture {
    pub storage: Storage,
    pub collection: CollectionId,
    pub defaults: Arc<BaseTables>,
}

impl Fixture {
    pub fn new() -> Self {
        init_tracing();
        let mut storage = Storage::new();
        let collection = storage.collections.create("Default");
        Self {
            storage,
            collection,
            defaults: Arc::new(BaseTables::new()),
        }
    }

    pub fn with_defaults(mut self, defaults: BaseTables) -> Self {
        self.defaults = Arc::new(defaults);
        self
    }

    pub fn add(&mut self, value: Mod, priority: i32) -> ModKey {
        let key = self.storage.mods.insert(value);
        self.set(key, ModSettings::enabled(priority));
        key
    }

    pub fn set(&mut self, key: ModKey, settings: ModSettings) {
        self.storage
            .collections
            .set_settings(self.collection, key.index().unwrap(), settings)
            .unwrap();
    }

    pub fn cache(&self) -> CollectionCache {
        CollectionCache::new(
            self.collection,
            "Default",
            self.defaults.clone(),
            TableSpace::Ready,
        )
    }

    /// A fresh cache built by one full recalculation.
    pub fn recalculated(&self) -> CollectionCache {
        let mut cache = self.cache();
        let view = self.storage.view(self.collection).unwrap();
        cache.full_recalculation(&view);
        cache
    }
}
