use serde::Deserialize;
use serde_json::{json, Value};

use crate::entities::sea_orm_active_enums::{
    BudgetLevel, IntensityLevel, ThemeType, TransportMode, TripOption,
};
use crate::error::PlannerError;

/// Body of `POST /api/routes/plan`.
///
/// Every trip dimension can be sent as a single ordinal or as a list; a
/// non-empty list wins over the single value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlanRequest {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub days: i32,

    pub theme: Option<i32>,
    pub budget: Option<i32>,
    pub intensity: Option<i32>,
    pub transport: Option<i32>,

    pub themes: Option<Vec<i32>>,
    pub budgets: Option<Vec<i32>>,
    pub intensities: Option<Vec<i32>>,
    pub transports: Option<Vec<i32>>,
}

/// Validated trip parameters with every dimension resolved to a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripSelection {
    pub region: String,
    pub days: i32,
    pub themes: Vec<ThemeType>,
    pub budgets: Vec<BudgetLevel>,
    pub intensities: Vec<IntensityLevel>,
    pub transports: Vec<TransportMode>,
}

impl TryFrom<RoutePlanRequest> for TripSelection {
    type Error = PlannerError;

    fn try_from(request: RoutePlanRequest) -> Result<Self, Self::Error> {
        let region = request.region.trim().to_string();
        if region.is_empty() {
            return Err(PlannerError::Validation("Region is required".to_string()));
        }
        if request.days < 1 {
            return Err(PlannerError::Validation(
                "Days must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            region,
            days: request.days,
            themes: effective(request.theme, request.themes)?,
            budgets: effective(request.budget, request.budgets)?,
            intensities: effective(request.intensity, request.intensities)?,
            transports: effective(request.transport, request.transports)?,
        })
    }
}

fn effective<T: TripOption>(single: Option<i32>, list: Option<Vec<i32>>) -> Result<Vec<T>, PlannerError> {
    let ordinals = match list {
        Some(list) if !list.is_empty() => list,
        _ => single.into_iter().collect(),
    };

    ordinals
        .into_iter()
        .map(|ordinal| {
            T::from_ordinal(ordinal).ok_or_else(|| {
                PlannerError::Validation(format!("Invalid {} value: {}", T::DIMENSION, ordinal))
            })
        })
        .collect()
}

pub fn labels<T: TripOption>(values: &[T]) -> Vec<&'static str> {
    values.iter().map(|v| v.label()).collect()
}

impl TripSelection {
    pub fn primary_theme(&self) -> Option<ThemeType> {
        self.themes.first().copied()
    }

    pub fn primary_budget(&self) -> Option<BudgetLevel> {
        self.budgets.first().copied()
    }

    pub fn primary_intensity(&self) -> Option<IntensityLevel> {
        self.intensities.first().copied()
    }

    pub fn primary_transport(&self) -> Option<TransportMode> {
        self.transports.first().copied()
    }

    /// Request payload stored on the generation request.
    pub fn snapshot(&self) -> Value {
        json!({
            "region": self.region,
            "days": self.days,
            "themes": labels(&self.themes),
            "budgets": labels(&self.budgets),
            "intensities": labels(&self.intensities),
            "transports": labels(&self.transports),
        })
    }
}
