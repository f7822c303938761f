use sea_orm::*;
use sea_query::{Index, PostgresQueryBuilder};
use tracing::info;

use crate::entity::{access_log, activity_log, role, role_permission};

/// Default roles seeded on startup.
const DEFAULT_ROLES: &[&str] = &["admin", "lecturer", "student"];

/// Default role-permission mappings seeded on startup.
const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    // Admin
    ("admin", "material:upload"),
    ("admin", "material:edit"),
    ("admin", "material:delete"),
    ("admin", "stats:view"),
    // Lecturer
    ("lecturer", "material:upload"),
    ("lecturer", "material:edit"),
    ("lecturer", "material:delete"),
    ("lecturer", "stats:view"),
    // Students only read; listing needs authentication, not a permission.
];

/// Seed the `role` and `role_permission` tables with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Seed roles
    let mut roles_inserted = 0u32;
    for &name in DEFAULT_ROLES {
        let model = role::ActiveModel {
            name: Set(name.to_string()),
        };

        let result = role::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(role::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => roles_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if roles_inserted > 0 {
        info!("Seeded {} new roles", roles_inserted);
    }

    // Seed role-permission mappings
    let mut perms_inserted = 0u32;
    for &(role, permission) in DEFAULT_MAPPINGS {
        let model = role_permission::ActiveModel {
            role: Set(role.to_string()),
            permission: Set(permission.to_string()),
        };

        let result = role_permission::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    role_permission::Column::Role,
                    role_permission::Column::Permission,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => perms_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if perms_inserted > 0 {
        info!("Seeded {} new role-permission mappings", perms_inserted);
    }

    Ok(())
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support plain non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Timestamp index for the trailing-24h activity stats query.
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_activity_log_timestamp")
        .table(activity_log::Entity)
        .col(activity_log::Column::Timestamp)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&stmt).await {
        Ok(_) => {
            info!("Ensured index idx_activity_log_timestamp exists");
        }
        Err(e) => {
            tracing::warn!("Failed to create index idx_activity_log_timestamp: {}", e);
        }
    }

    // Timestamp index for the trailing-7d access stats query.
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_access_log_timestamp")
        .table(access_log::Entity)
        .col(access_log::Column::Timestamp)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&stmt).await {
        Ok(_) => {
            info!("Ensured index idx_access_log_timestamp exists");
        }
        Err(e) => {
            tracing::warn!("Failed to create index idx_access_log_timestamp: {}", e);
        }
    }

    Ok(())
}
