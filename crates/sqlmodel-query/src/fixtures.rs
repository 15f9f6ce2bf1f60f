//! Mapped classes shared by the unit tests.

use std::sync::OnceLock;

use sqlmodel_core::{
    FieldInfo, LazyLoadStrategy, Mapper, MapperDef, Registry, RelationshipInfo, RelationshipKind,
};

pub fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        Registry::builder()
            .mapper(
                MapperDef::new("User", "users")
                    .field(FieldInfo::new("id").primary_key(true))
                    .field(FieldInfo::new("name"))
                    .field(FieldInfo::new("bio").group("profile"))
                    .relationship(RelationshipInfo::new(
                        "addresses",
                        "Address",
                        RelationshipKind::OneToMany,
                    ))
                    .relationship(
                        RelationshipInfo::new("orders", "Order", RelationshipKind::OneToMany)
                            .back_populates("user"),
                    ),
            )
            .mapper(
                MapperDef::new("Address", "addresses")
                    .field(FieldInfo::new("id").primary_key(true))
                    .field(FieldInfo::new("email_address"))
                    .relationship(RelationshipInfo::new(
                        "user",
                        "User",
                        RelationshipKind::ManyToOne,
                    )),
            )
            .mapper(
                MapperDef::new("Order", "orders")
                    .field(FieldInfo::new("id").primary_key(true))
                    .field(FieldInfo::new("description").deferred(true))
                    .field(FieldInfo::new("isopen"))
                    .relationship(RelationshipInfo::new(
                        "user",
                        "User",
                        RelationshipKind::ManyToOne,
                    ))
                    .relationship(
                        RelationshipInfo::new("items", "Item", RelationshipKind::ManyToMany)
                            .lazy_strategy(LazyLoadStrategy::Subquery),
                    ),
            )
            .mapper(
                MapperDef::new("Item", "items")
                    .field(FieldInfo::new("id").primary_key(true))
                    .field(FieldInfo::new("description"))
                    .relationship(RelationshipInfo::new(
                        "keywords",
                        "Keyword",
                        RelationshipKind::ManyToMany,
                    )),
            )
            .mapper(
                MapperDef::new("Keyword", "keywords")
                    .field(FieldInfo::new("id").primary_key(true))
                    .field(FieldInfo::new("name")),
            )
            .mapper(
                MapperDef::new("Company", "companies")
                    .field(FieldInfo::new("company_id").primary_key(true))
                    .field(FieldInfo::new("name"))
                    .relationship(RelationshipInfo::new(
                        "employees",
                        "Person",
                        RelationshipKind::OneToMany,
                    )),
            )
            .mapper(
                MapperDef::new("Person", "people")
                    .field(FieldInfo::new("person_id").primary_key(true))
                    .field(FieldInfo::new("name")),
            )
            .mapper(
                MapperDef::new("Engineer", "engineers")
                    .inherits("Person")
                    .polymorphic_identity("engineer")
                    .field(FieldInfo::new("primary_language"))
                    .relationship(RelationshipInfo::new(
                        "machines",
                        "Machine",
                        RelationshipKind::OneToMany,
                    )),
            )
            .mapper(
                MapperDef::new("Manager", "managers")
                    .inherits("Person")
                    .polymorphic_identity("manager")
                    .field(FieldInfo::new("manager_name")),
            )
            .mapper(
                MapperDef::new("Machine", "machines")
                    .field(FieldInfo::new("machine_id").primary_key(true))
                    .field(FieldInfo::new("name")),
            )
            .configure()
            .expect("fixture mappers configure")
    })
}

pub fn mapper(class_name: &str) -> &'static Mapper {
    registry().mapper(class_name).expect("fixture mapper exists")
}
