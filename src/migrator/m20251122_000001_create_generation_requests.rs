use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GenerationRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GenerationRequests::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GenerationRequests::UserId).integer().not_null())
                    .col(ColumnDef::new(GenerationRequests::ItineraryId).integer().null())
                    .col(
                        ColumnDef::new(GenerationRequests::RequestPayload)
                            .json()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GenerationRequests::ResponsePayload).json().null())
                    .col(
                        ColumnDef::new(GenerationRequests::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(GenerationRequests::CreatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GenerationRequests::UpdatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_generation_requests_user")
                            .from(GenerationRequests::Table, GenerationRequests::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_generation_requests_itinerary")
                            .from(GenerationRequests::Table, GenerationRequests::ItineraryId)
                            .to(Itineraries::Table, Itineraries::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_generation_requests_status")
                    .table(GenerationRequests::Table)
                    .col(GenerationRequests::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GenerationRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum GenerationRequests {
    Table,
    Id,
    UserId,
    ItineraryId,
    RequestPayload,
    ResponsePayload,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Itineraries {
    Table,
    Id,
}
