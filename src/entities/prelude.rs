pub use super::activity::Entity as Activity;
pub use super::favorite::Entity as Favorite;
pub use super::generation_request::Entity as GenerationRequest;
pub use super::google_review::Entity as GoogleReview;
pub use super::itinerary::Entity as Itinerary;
pub use super::itinerary_day::Entity as ItineraryDay;
pub use super::place::Entity as Place;
pub use super::place_photo::Entity as PlacePhoto;
pub use super::user::Entity as User;
