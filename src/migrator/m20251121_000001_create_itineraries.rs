use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Itineraries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Itineraries::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Itineraries::UserId).integer().not_null())
                    .col(ColumnDef::new(Itineraries::Name).string().not_null())
                    .col(ColumnDef::new(Itineraries::Region).string().not_null())
                    .col(ColumnDef::new(Itineraries::DaysCount).integer().not_null())
                    .col(ColumnDef::new(Itineraries::Theme).string().null())
                    .col(ColumnDef::new(Itineraries::Budget).string().null())
                    .col(ColumnDef::new(Itineraries::Intensity).string().null())
                    .col(ColumnDef::new(Itineraries::Transport).string().null())
                    .col(
                        ColumnDef::new(Itineraries::IsAiGenerated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Itineraries::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Itineraries::CreatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_itineraries_user")
                            .from(Itineraries::Table, Itineraries::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_itineraries_user_created")
                    .table(Itineraries::Table)
                    .col(Itineraries::UserId)
                    .col(Itineraries::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ItineraryDays::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ItineraryDays::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ItineraryDays::ItineraryId).integer().not_null())
                    .col(ColumnDef::new(ItineraryDays::DayNumber).integer().not_null())
                    .col(ColumnDef::new(ItineraryDays::WeatherInfo).json().null())
                    .col(ColumnDef::new(ItineraryDays::CreatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_itinerary_days_itinerary")
                            .from(ItineraryDays::Table, ItineraryDays::ItineraryId)
                            .to(Itineraries::Table, Itineraries::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per day number within an itinerary
        manager
            .create_index(
                Index::create()
                    .name("uq_itinerary_days_itinerary_day_number")
                    .table(ItineraryDays::Table)
                    .col(ItineraryDays::ItineraryId)
                    .col(ItineraryDays::DayNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Activities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Activities::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Activities::ItineraryDayId).integer().null())
                    .col(ColumnDef::new(Activities::PlaceId).integer().null())
                    .col(ColumnDef::new(Activities::Title).string().not_null())
                    .col(ColumnDef::new(Activities::Description).text().null())
                    .col(ColumnDef::new(Activities::Reason).text().null())
                    .col(ColumnDef::new(Activities::StartTime).time().null())
                    .col(ColumnDef::new(Activities::EndTime).time().null())
                    .col(ColumnDef::new(Activities::ImageUrls).json().null())
                    .col(ColumnDef::new(Activities::CreatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activities_itinerary_day")
                            .from(Activities::Table, Activities::ItineraryDayId)
                            .to(ItineraryDays::Table, ItineraryDays::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activities_place")
                            .from(Activities::Table, Activities::PlaceId)
                            .to(Places::Table, Places::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_activities_itinerary_day_id")
                    .table(Activities::Table)
                    .col(Activities::ItineraryDayId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Activities::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ItineraryDays::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Itineraries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Itineraries {
    Table,
    Id,
    UserId,
    Name,
    Region,
    DaysCount,
    Theme,
    Budget,
    Intensity,
    Transport,
    IsAiGenerated,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ItineraryDays {
    Table,
    Id,
    ItineraryId,
    DayNumber,
    WeatherInfo,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Activities {
    Table,
    Id,
    ItineraryDayId,
    PlaceId,
    Title,
    Description,
    Reason,
    StartTime,
    EndTime,
    ImageUrls,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Places {
    Table,
    Id,
}
