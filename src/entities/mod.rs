pub mod activity;
pub mod favorite;
pub mod generation_request;
pub mod google_review;
pub mod itinerary;
pub mod itinerary_day;
pub mod place;
pub mod place_photo;
pub mod sea_orm_active_enums;
pub mod user;

pub use activity::Entity as Activity;
pub use favorite::Entity as Favorite;
pub use generation_request::Entity as GenerationRequest;
pub use google_review::Entity as GoogleReview;
pub use itinerary::Entity as Itinerary;
pub use itinerary_day::Entity as ItineraryDay;
pub use place::Entity as Place;
pub use place_photo::Entity as PlacePhoto;
pub use user::Entity as User;

pub mod prelude;
