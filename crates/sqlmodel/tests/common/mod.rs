//! Mapped classes shared by the integration tests.

#![allow(dead_code)]

use std::sync::OnceLock;

use sqlmodel::{
    FieldInfo, LazyLoadStrategy, Mapper, Model, PathRegistry, Registry, RelationshipInfo,
    RelationshipKind,
};

pub struct User;

impl Model for User {
    const CLASS_NAME: &'static str = "User";
    const TABLE_NAME: &'static str = "users";
    const RELATIONSHIPS: &'static [RelationshipInfo] = &[
        RelationshipInfo::new("addresses", "Address", RelationshipKind::OneToMany),
        RelationshipInfo::new("orders", "Order", RelationshipKind::OneToMany).back_populates("user"),
    ];

    fn fields() -> &'static [FieldInfo] {
        const FIELDS: &[FieldInfo] = &[
            FieldInfo::new("id").primary_key(true),
            FieldInfo::new("name"),
            FieldInfo::new("bio").group("profile"),
        ];
        FIELDS
    }
}

pub struct Address;

impl Model for Address {
    const CLASS_NAME: &'static str = "Address";
    const TABLE_NAME: &'static str = "addresses";
    const RELATIONSHIPS: &'static [RelationshipInfo] =
        &[RelationshipInfo::new("user", "User", RelationshipKind::ManyToOne)];

    fn fields() -> &'static [FieldInfo] {
        const FIELDS: &[FieldInfo] = &[
            FieldInfo::new("id").primary_key(true),
            FieldInfo::new("user_id"),
            FieldInfo::new("email_address"),
        ];
        FIELDS
    }
}

pub struct Order;

impl Model for Order {
    const CLASS_NAME: &'static str = "Order";
    const TABLE_NAME: &'static str = "orders";
    const RELATIONSHIPS: &'static [RelationshipInfo] = &[
        RelationshipInfo::new("user", "User", RelationshipKind::ManyToOne),
        RelationshipInfo::new("items", "Item", RelationshipKind::ManyToMany)
            .lazy_strategy(LazyLoadStrategy::Subquery),
    ];

    fn fields() -> &'static [FieldInfo] {
        const FIELDS: &[FieldInfo] = &[
            FieldInfo::new("id").primary_key(true),
            FieldInfo::new("user_id"),
            FieldInfo::new("description").deferred(true),
            FieldInfo::new("isopen"),
        ];
        FIELDS
    }
}

pub struct Item;

impl Model for Item {
    const CLASS_NAME: &'static str = "Item";
    const TABLE_NAME: &'static str = "items";
    const RELATIONSHIPS: &'static [RelationshipInfo] =
        &[RelationshipInfo::new("keywords", "Keyword", RelationshipKind::ManyToMany)];

    fn fields() -> &'static [FieldInfo] {
        const FIELDS: &[FieldInfo] = &[
            FieldInfo::new("id").primary_key(true),
            FieldInfo::new("description"),
        ];
        FIELDS
    }
}

pub struct Keyword;

impl Model for Keyword {
    const CLASS_NAME: &'static str = "Keyword";
    const TABLE_NAME: &'static str = "keywords";

    fn fields() -> &'static [FieldInfo] {
        const FIELDS: &[FieldInfo] = &[FieldInfo::new("id").primary_key(true), FieldInfo::new("name")];
        FIELDS
    }
}

pub struct Company;

impl Model for Company {
    const CLASS_NAME: &'static str = "Company";
    const TABLE_NAME: &'static str = "companies";
    const RELATIONSHIPS: &'static [RelationshipInfo] =
        &[RelationshipInfo::new("employees", "Person", RelationshipKind::OneToMany)];

    fn fields() -> &'static [FieldInfo] {
        const FIELDS: &[FieldInfo] = &[
            FieldInfo::new("company_id").primary_key(true),
            FieldInfo::new("name"),
        ];
        FIELDS
    }
}

pub struct Person;

impl Model for Person {
    const CLASS_NAME: &'static str = "Person";
    const TABLE_NAME: &'static str = "people";

    fn fields() -> &'static [FieldInfo] {
        const FIELDS: &[FieldInfo] = &[
            FieldInfo::new("person_id").primary_key(true),
            FieldInfo::new("company_id"),
            FieldInfo::new("name"),
        ];
        FIELDS
    }
}

pub struct Engineer;

impl Model for Engineer {
    const CLASS_NAME: &'static str = "Engineer";
    const TABLE_NAME: &'static str = "engineers";
    const INHERITS: Option<&'static str> = Some("Person");
    const RELATIONSHIPS: &'static [RelationshipInfo] =
        &[RelationshipInfo::new("machines", "Machine", RelationshipKind::OneToMany)];

    fn fields() -> &'static [FieldInfo] {
        const FIELDS: &[FieldInfo] = &[FieldInfo::new("primary_language")];
        FIELDS
    }
}

pub struct Manager;

impl Model for Manager {
    const CLASS_NAME: &'static str = "Manager";
    const TABLE_NAME: &'static str = "managers";
    const INHERITS: Option<&'static str> = Some("Person");

    fn fields() -> &'static [FieldInfo] {
        const FIELDS: &[FieldInfo] = &[FieldInfo::new("manager_name")];
        FIELDS
    }
}

pub struct Machine;

impl Model for Machine {
    const CLASS_NAME: &'static str = "Machine";
    const TABLE_NAME: &'static str = "machines";

    fn fields() -> &'static [FieldInfo] {
        const FIELDS: &[FieldInfo] = &[
            FieldInfo::new("machine_id").primary_key(true),
            FieldInfo::new("engineer_id"),
            FieldInfo::new("name"),
        ];
        FIELDS
    }
}

pub fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        Registry::builder()
            .model::<User>()
            .model::<Address>()
            .model::<Order>()
            .model::<Item>()
            .model::<Keyword>()
            .model::<Company>()
            .model::<Person>()
            .model::<Engineer>()
            .model::<Manager>()
            .model::<Machine>()
            .configure()
            .expect("test mappers configure")
    })
}

pub fn mapper(class_name: &str) -> &'static Mapper {
    registry().mapper(class_name).expect("test mapper exists")
}

/// The property path from `root` through `keys`, as options record it.
pub fn path(root: &'static Mapper, keys: &[&str]) -> PathRegistry {
    let mut path = PathRegistry::for_entity(root);
    let mut current = root;
    for (i, key) in keys.iter().enumerate() {
        let prop = current.get_property(key).expect("property exists");
        path = path.push_property(prop);
        if i + 1 < keys.len() {
            current = prop.target().expect("relationship");
            path = path.push_entity(current);
        }
    }
    path
}
