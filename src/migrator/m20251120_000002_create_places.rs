use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Places::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Places::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Places::Name).string().not_null())
                    .col(ColumnDef::new(Places::Description).text().null())
                    .col(ColumnDef::new(Places::Category).string().null())
                    .col(ColumnDef::new(Places::Latitude).double().null())
                    .col(ColumnDef::new(Places::Longitude).double().null())
                    .col(ColumnDef::new(Places::City).string().null())
                    .col(ColumnDef::new(Places::Country).string().null())
                    .col(ColumnDef::new(Places::GooglePlaceId).string().null())
                    .col(ColumnDef::new(Places::FormattedAddress).string().null())
                    .col(ColumnDef::new(Places::GoogleMapsUrl).string().null())
                    .col(ColumnDef::new(Places::GoogleRating).double().null())
                    .col(ColumnDef::new(Places::UserRatingsTotal).integer().null())
                    .col(ColumnDef::new(Places::PriceLevel).integer().null())
                    .col(ColumnDef::new(Places::OpeningHours).json().null())
                    .col(ColumnDef::new(Places::PhotoUrls).json().null())
                    .col(ColumnDef::new(Places::CreatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        // (name, city) lookup key for place reuse. Not unique.
        manager
            .create_index(
                Index::create()
                    .name("idx_places_name_city")
                    .table(Places::Table)
                    .col(Places::Name)
                    .col(Places::City)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PlacePhotos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PlacePhotos::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PlacePhotos::PlaceId).integer().not_null())
                    .col(ColumnDef::new(PlacePhotos::ImageUrl).text().not_null())
                    .col(ColumnDef::new(PlacePhotos::CreatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_place_photos_place")
                            .from(PlacePhotos::Table, PlacePhotos::PlaceId)
                            .to(Places::Table, Places::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_place_photos_place_id")
                    .table(PlacePhotos::Table)
                    .col(PlacePhotos::PlaceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GoogleReviews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GoogleReviews::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GoogleReviews::PlaceId).integer().not_null())
                    .col(ColumnDef::new(GoogleReviews::AuthorName).string().not_null())
                    .col(ColumnDef::new(GoogleReviews::Comment).text().not_null())
                    .col(ColumnDef::new(GoogleReviews::Rating).integer().not_null())
                    .col(ColumnDef::new(GoogleReviews::ProfilePhotoUrl).text().null())
                    .col(ColumnDef::new(GoogleReviews::ReviewTime).date_time().null())
                    .col(ColumnDef::new(GoogleReviews::CreatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_google_reviews_place")
                            .from(GoogleReviews::Table, GoogleReviews::PlaceId)
                            .to(Places::Table, Places::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_google_reviews_place_id")
                    .table(GoogleReviews::Table)
                    .col(GoogleReviews::PlaceId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GoogleReviews::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PlacePhotos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Places::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Places {
    Table,
    Id,
    Name,
    Description,
    Category,
    Latitude,
    Longitude,
    City,
    Country,
    GooglePlaceId,
    FormattedAddress,
    GoogleMapsUrl,
    GoogleRating,
    UserRatingsTotal,
    PriceLevel,
    OpeningHours,
    PhotoUrls,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PlacePhotos {
    Table,
    Id,
    PlaceId,
    ImageUrl,
    CreatedAt,
}

#[derive(DeriveIden)]
enum GoogleReviews {
    Table,
    Id,
    PlaceId,
    AuthorName,
    Comment,
    Rating,
    ProfilePhotoUrl,
    ReviewTime,
    CreatedAt,
}
