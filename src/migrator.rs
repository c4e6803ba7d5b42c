use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241101_000001_create_reference_tables::Migration),
            Box::new(m20241101_000002_create_mrp_tables::Migration),
            Box::new(m20241101_000003_create_mail_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20241101_000001_create_reference_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20241101_000001_create_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Users::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(ColumnDef::new(Users::Login).string().not_null().unique_key())
                        .col(
                            ColumnDef::new(Users::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(UserRole::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(UserRole::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(UserRole::UserId).integer().not_null())
                        .col(ColumnDef::new(UserRole::Role).string_len(32).not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_user_role_user")
                                .from(UserRole::Table, UserRole::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_user_role_role")
                        .table(UserRole::Table)
                        .col(UserRole::Role)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Uom::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Uom::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Uom::Name).string().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductTemplate::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductTemplate::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ProductTemplate::Name).string().not_null())
                        .col(ColumnDef::new(ProductTemplate::UomId).integer().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Product::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Product::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Product::ProductTmplId).integer().not_null())
                        .col(ColumnDef::new(Product::Name).string().not_null())
                        .col(ColumnDef::new(Product::DefaultCode).string().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_template")
                                .from(Product::Table, Product::ProductTmplId)
                                .to(ProductTemplate::Table, ProductTemplate::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Product::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductTemplate::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Uom::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(UserRole::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Name,
        Login,
        Active,
    }

    #[derive(DeriveIden)]
    enum UserRole {
        Table,
        Id,
        UserId,
        Role,
    }

    #[derive(DeriveIden)]
    enum Uom {
        Table,
        Id,
        Name,
    }

    #[derive(DeriveIden)]
    pub(super) enum ProductTemplate {
        Table,
        Id,
        Name,
        UomId,
    }

    #[derive(DeriveIden)]
    enum Product {
        Table,
        Id,
        ProductTmplId,
        Name,
        DefaultCode,
    }
}

mod m20241101_000002_create_mrp_tables {

    use super::m20241101_000001_create_reference_tables::ProductTemplate;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20241101_000002_create_mrp_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(MrpBom::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MrpBom::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(MrpBom::Code).string().null())
                        .col(ColumnDef::new(MrpBom::ProductTmplId).integer().not_null())
                        .col(ColumnDef::new(MrpBom::ProductUomId).integer().null())
                        .col(ColumnDef::new(MrpBom::ProductOwnerId).integer().null())
                        .col(ColumnDef::new(MrpBom::AdminId).integer().null())
                        .col(
                            ColumnDef::new(MrpBom::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MrpBom::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_mrp_bom_template")
                                .from(MrpBom::Table, MrpBom::ProductTmplId)
                                .to(ProductTemplate::Table, ProductTemplate::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_mrp_bom_template")
                        .table(MrpBom::Table)
                        .col(MrpBom::ProductTmplId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(MrpOperation::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MrpOperation::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(MrpOperation::BomId).integer().not_null())
                        .col(ColumnDef::new(MrpOperation::Name).string().not_null())
                        .col(
                            ColumnDef::new(MrpOperation::Sequence)
                                .integer()
                                .not_null()
                                .default(10),
                        )
                        .col(ColumnDef::new(MrpOperation::AssignedUserId).integer().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_mrp_operation_bom")
                                .from(MrpOperation::Table, MrpOperation::BomId)
                                .to(MrpBom::Table, MrpBom::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // Request and production reference each other; the links are plain
            // integer columns so either side can be created first.
            manager
                .create_table(
                    Table::create()
                        .table(MrpRequest::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MrpRequest::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(MrpRequest::Name).string().not_null())
                        .col(ColumnDef::new(MrpRequest::ExternalOrderRef).string().null())
                        .col(ColumnDef::new(MrpRequest::ProductId).integer().not_null())
                        .col(ColumnDef::new(MrpRequest::ProductTmplId).integer().not_null())
                        .col(ColumnDef::new(MrpRequest::Qty).double().not_null())
                        .col(ColumnDef::new(MrpRequest::UomId).integer().null())
                        .col(
                            ColumnDef::new(MrpRequest::StartDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(MrpRequest::RequestedDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MrpRequest::ExpectedDeliveryDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(MrpRequest::BomId).integer().null())
                        .col(
                            ColumnDef::new(MrpRequest::BomExists)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(MrpRequest::ProductOwnerId).integer().null())
                        .col(ColumnDef::new(MrpRequest::AdminId).integer().null())
                        .col(ColumnDef::new(MrpRequest::Note).text().null())
                        .col(
                            ColumnDef::new(MrpRequest::State)
                                .string_len(32)
                                .not_null()
                                .default("new"),
                        )
                        .col(ColumnDef::new(MrpRequest::MrpProductionId).integer().null())
                        .col(
                            ColumnDef::new(MrpRequest::NotifiedPo)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(MrpRequest::AutoSubmittedPo)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(MrpRequest::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MrpRequest::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_mrp_request_state")
                        .table(MrpRequest::Table)
                        .col(MrpRequest::State)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_mrp_request_created_at")
                        .table(MrpRequest::Table)
                        .col(MrpRequest::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(MrpProduction::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MrpProduction::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(MrpProduction::Name).string().not_null())
                        .col(ColumnDef::new(MrpProduction::Origin).string().null())
                        .col(ColumnDef::new(MrpProduction::ProductId).integer().not_null())
                        .col(ColumnDef::new(MrpProduction::ProductQty).double().not_null())
                        .col(ColumnDef::new(MrpProduction::ProductUomId).integer().null())
                        .col(ColumnDef::new(MrpProduction::BomId).integer().null())
                        .col(
                            ColumnDef::new(MrpProduction::DateStart)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(MrpProduction::DateDeadline)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(MrpProduction::DateFinished)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(MrpProduction::RequestedDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(MrpProduction::ExpectedDeliveryDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(MrpProduction::UserId).integer().null())
                        .col(
                            ColumnDef::new(MrpProduction::State)
                                .string_len(16)
                                .not_null()
                                .default("draft"),
                        )
                        .col(
                            ColumnDef::new(MrpProduction::MrpRequestId)
                                .integer()
                                .null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(MrpProduction::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MrpProduction::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(MrpWorkorder::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MrpWorkorder::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(MrpWorkorder::Name).string().not_null())
                        .col(ColumnDef::new(MrpWorkorder::ProductionId).integer().not_null())
                        .col(ColumnDef::new(MrpWorkorder::OperationId).integer().null())
                        .col(ColumnDef::new(MrpWorkorder::AssignedUserId).integer().null())
                        .col(
                            ColumnDef::new(MrpWorkorder::State)
                                .string_len(16)
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(MrpWorkorder::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_mrp_workorder_production")
                                .from(MrpWorkorder::Table, MrpWorkorder::ProductionId)
                                .to(MrpProduction::Table, MrpProduction::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_mrp_workorder_assigned_user")
                        .table(MrpWorkorder::Table)
                        .col(MrpWorkorder::AssignedUserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MrpWorkorder::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(MrpProduction::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(MrpRequest::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(MrpOperation::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(MrpBom::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum MrpBom {
        Table,
        Id,
        Code,
        ProductTmplId,
        ProductUomId,
        ProductOwnerId,
        AdminId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum MrpOperation {
        Table,
        Id,
        BomId,
        Name,
        Sequence,
        AssignedUserId,
    }

    #[derive(DeriveIden)]
    enum MrpRequest {
        Table,
        Id,
        Name,
        ExternalOrderRef,
        ProductId,
        ProductTmplId,
        Qty,
        UomId,
        StartDate,
        RequestedDate,
        ExpectedDeliveryDate,
        BomId,
        BomExists,
        ProductOwnerId,
        AdminId,
        Note,
        State,
        MrpProductionId,
        NotifiedPo,
        AutoSubmittedPo,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum MrpProduction {
        Table,
        Id,
        Name,
        Origin,
        ProductId,
        ProductQty,
        ProductUomId,
        BomId,
        DateStart,
        DateDeadline,
        DateFinished,
        RequestedDate,
        ExpectedDeliveryDate,
        UserId,
        State,
        MrpRequestId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum MrpWorkorder {
        Table,
        Id,
        Name,
        ProductionId,
        OperationId,
        AssignedUserId,
        State,
        CreatedAt,
    }
}

mod m20241101_000003_create_mail_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20241101_000003_create_mail_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(MailMessage::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MailMessage::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(MailMessage::Model).string().not_null())
                        .col(ColumnDef::new(MailMessage::ResId).integer().not_null())
                        .col(ColumnDef::new(MailMessage::Body).text().not_null())
                        .col(ColumnDef::new(MailMessage::AuthorId).integer().null())
                        .col(ColumnDef::new(MailMessage::RecipientId).integer().null())
                        .col(ColumnDef::new(MailMessage::Kind).string_len(16).not_null())
                        .col(
                            ColumnDef::new(MailMessage::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_mail_message_record")
                        .table(MailMessage::Table)
                        .col(MailMessage::Model)
                        .col(MailMessage::ResId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(MailActivityType::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MailActivityType::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(MailActivityType::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(MailActivityType::Name).string().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(MailActivity::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MailActivity::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(MailActivity::Model).string().not_null())
                        .col(ColumnDef::new(MailActivity::ResId).integer().not_null())
                        .col(
                            ColumnDef::new(MailActivity::ActivityTypeId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(MailActivity::UserId).integer().not_null())
                        .col(ColumnDef::new(MailActivity::Summary).string().not_null())
                        .col(ColumnDef::new(MailActivity::Note).text().null())
                        .col(ColumnDef::new(MailActivity::DateDeadline).date().not_null())
                        .col(
                            ColumnDef::new(MailActivity::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_mail_activity_type")
                                .from(MailActivity::Table, MailActivity::ActivityTypeId)
                                .to(MailActivityType::Table, MailActivityType::Id),
                        )
                        .to_owned(),
                )
                .await?;

            // The reminder job looks this type up by code.
            let seed = Query::insert()
                .into_table(MailActivityType::Table)
                .columns([MailActivityType::Code, MailActivityType::Name])
                .values_panic(["todo".into(), "To Do".into()])
                .to_owned();
            manager.exec_stmt(seed).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MailActivity::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(MailActivityType::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(MailMessage::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum MailMessage {
        Table,
        Id,
        Model,
        ResId,
        Body,
        AuthorId,
        RecipientId,
        Kind,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum MailActivityType {
        Table,
        Id,
        Code,
        Name,
    }

    #[derive(DeriveIden)]
    enum MailActivity {
        Table,
        Id,
        Model,
        ResId,
        ActivityTypeId,
        UserId,
        Summary,
        Note,
        DateDeadline,
        CreatedAt,
    }
}
