use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum ThemeType {
    #[sea_orm(string_value = "nature")]
    Nature,
    #[sea_orm(string_value = "sea")]
    Sea,
    #[sea_orm(string_value = "history")]
    History,
    #[sea_orm(string_value = "beach")]
    Beach,
    #[sea_orm(string_value = "food")]
    Food,
    #[sea_orm(string_value = "photospot")]
    Photospot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum BudgetLevel {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum IntensityLevel {
    #[sea_orm(string_value = "relaxed")]
    Relaxed,
    #[sea_orm(string_value = "active")]
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    #[sea_orm(string_value = "car")]
    Car,
    #[sea_orm(string_value = "walk")]
    Walk,
    #[sea_orm(string_value = "public_transport")]
    PublicTransport,
}

/// Trip dimensions arrive from the client as 0-based ordinals.
pub trait TripOption: Sized + Copy + 'static {
    const DIMENSION: &'static str;
    const VARIANTS: &'static [Self];

    fn label(self) -> &'static str;

    fn from_ordinal(ordinal: i32) -> Option<Self> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| Self::VARIANTS.get(i).copied())
    }
}

impl TripOption for ThemeType {
    const DIMENSION: &'static str = "theme";
    const VARIANTS: &'static [Self] = &[
        Self::Nature,
        Self::Sea,
        Self::History,
        Self::Beach,
        Self::Food,
        Self::Photospot,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::Nature => "nature",
            Self::Sea => "sea",
            Self::History => "history",
            Self::Beach => "beach",
            Self::Food => "food",
            Self::Photospot => "photospot",
        }
    }
}

impl TripOption for BudgetLevel {
    const DIMENSION: &'static str = "budget";
    const VARIANTS: &'static [Self] = &[Self::Low, Self::Medium, Self::High];

    fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl TripOption for IntensityLevel {
    const DIMENSION: &'static str = "intensity";
    const VARIANTS: &'static [Self] = &[Self::Relaxed, Self::Active];

    fn label(self) -> &'static str {
        match self {
            Self::Relaxed => "relaxed",
            Self::Active => "active",
        }
    }
}

impl TripOption for TransportMode {
    const DIMENSION: &'static str = "transport";
    const VARIANTS: &'static [Self] = &[Self::Car, Self::Walk, Self::PublicTransport];

    fn label(self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Walk => "walk",
            Self::PublicTransport => "public_transport",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {entity} status transition: {from} -> {to}")]
pub struct StatusTransitionError {
    pub entity: &'static str,
    pub from: &'static str,
    pub to: &'static str,
}

/// Audit status of one generation attempt. Moves once, out of `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl GenerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed) | (Self::Pending, Self::Failed)
        )
    }

    pub fn transition(self, next: Self) -> Result<Self, StatusTransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StatusTransitionError {
                entity: "generation request",
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }
}

/// Lifecycle of a materialized itinerary.
///
/// `Failed` is only reachable when persistence breaks after the row exists;
/// enrichment problems end in `CompletedWithWarnings` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum ItineraryStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "completed_with_warnings")]
    CompletedWithWarnings,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl ItineraryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::CompletedWithWarnings => "completed_with_warnings",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::CompletedWithWarnings | Self::Failed
        )
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Pending, Self::Failed)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::CompletedWithWarnings)
                | (Self::Processing, Self::Failed)
        )
    }

    pub fn transition(self, next: Self) -> Result<Self, StatusTransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StatusTransitionError {
                entity: "itinerary",
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_map_to_variants() {
        assert_eq!(ThemeType::from_ordinal(0), Some(ThemeType::Nature));
        assert_eq!(ThemeType::from_ordinal(5), Some(ThemeType::Photospot));
        assert_eq!(ThemeType::from_ordinal(6), None);
        assert_eq!(ThemeType::from_ordinal(-1), None);
        assert_eq!(BudgetLevel::from_ordinal(2), Some(BudgetLevel::High));
        assert_eq!(IntensityLevel::from_ordinal(2), None);
        assert_eq!(
            TransportMode::from_ordinal(2).map(TripOption::label),
            Some("public_transport")
        );
    }

    #[test]
    fn generation_status_is_monotonic() {
        use GenerationStatus::*;
        assert_eq!(Pending.transition(Completed), Ok(Completed));
        assert_eq!(Pending.transition(Failed), Ok(Failed));
        assert!(Completed.transition(Pending).is_err());
        assert!(Failed.transition(Completed).is_err());
        assert!(Completed.transition(Failed).is_err());
    }

    #[test]
    fn itinerary_status_follows_pipeline_order() {
        use ItineraryStatus::*;
        assert_eq!(Pending.transition(Processing), Ok(Processing));
        assert_eq!(Processing.transition(Completed), Ok(Completed));
        assert_eq!(
            Processing.transition(CompletedWithWarnings),
            Ok(CompletedWithWarnings)
        );
        assert!(Pending.transition(Completed).is_err());
        assert!(Completed.transition(Processing).is_err());
        assert!(CompletedWithWarnings.transition(Completed).is_err());
        assert!(Failed.transition(Processing).is_err());
    }

    #[test]
    fn transition_error_names_both_states() {
        let err = ItineraryStatus::Completed
            .transition(ItineraryStatus::Pending)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid itinerary status transition: completed -> pending"
        );
    }
}
