use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LabelCategories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LabelCategories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LabelCategories::LabelId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LabelCategories::CategoryId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LabelCategories::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_label_categories_label")
                            .from(LabelCategories::Table, LabelCategories::LabelId)
                            .to(Labels::Table, Labels::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_label_categories_category")
                            .from(LabelCategories::Table, LabelCategories::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_label_categories_pair_unique")
                    .table(LabelCategories::Table)
                    .col(LabelCategories::LabelId)
                    .col(LabelCategories::CategoryId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_label_categories_category")
                    .table(LabelCategories::Table)
                    .col(LabelCategories::CategoryId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CategoryProducts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CategoryProducts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CategoryProducts::CategoryId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CategoryProducts::ProductId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CategoryProducts::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_category_products_category")
                            .from(CategoryProducts::Table, CategoryProducts::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_category_products_product")
                            .from(CategoryProducts::Table, CategoryProducts::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_category_products_pair_unique")
                    .table(CategoryProducts::Table)
                    .col(CategoryProducts::CategoryId)
                    .col(CategoryProducts::ProductId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_category_products_product")
                    .table(CategoryProducts::Table)
                    .col(CategoryProducts::ProductId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CategoryProducts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LabelCategories::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum LabelCategories {
    Table,
    Id,
    LabelId,
    CategoryId,
    SortOrder,
}

#[derive(DeriveIden)]
enum CategoryProducts {
    Table,
    Id,
    CategoryId,
    ProductId,
    SortOrder,
}

#[derive(DeriveIden)]
enum Labels {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
}
