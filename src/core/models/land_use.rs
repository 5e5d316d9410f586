use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// The EuroSAT land-use labels, in the order of the model's output vector.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LandUseClass {
    AnnualCrop,
    Forest,
    HerbaceousVegetation,
    Highway,
    Industrial,
    Pasture,
    PermanentCrop,
    Residential,
    River,
    SeaLake,
}

impl LandUseClass {
    pub const ALL: [LandUseClass; 10] = [
        LandUseClass::AnnualCrop,
        LandUseClass::Forest,
        LandUseClass::HerbaceousVegetation,
        LandUseClass::Highway,
        LandUseClass::Industrial,
        LandUseClass::Pasture,
        LandUseClass::PermanentCrop,
        LandUseClass::Residential,
        LandUseClass::River,
        LandUseClass::SeaLake,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            LandUseClass::AnnualCrop => "AnnualCrop",
            LandUseClass::Forest => "Forest",
            LandUseClass::HerbaceousVegetation => "HerbaceousVegetation",
            LandUseClass::Highway => "Highway",
            LandUseClass::Industrial => "Industrial",
            LandUseClass::Pasture => "Pasture",
            LandUseClass::PermanentCrop => "PermanentCrop",
            LandUseClass::Residential => "Residential",
            LandUseClass::River => "River",
            LandUseClass::SeaLake => "SeaLake",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            LandUseClass::AnnualCrop => {
                "Annual crops: plants sown and harvested every year (wheat, maize, barley, rice, sunflower). Short life cycle."
            }
            LandUseClass::Forest => {
                "Forest: areas covered by trees and dense vegetation, natural or planted. Important for biodiversity and climate."
            }
            LandUseClass::HerbaceousVegetation => {
                "Herbaceous vegetation: non-woody plants (grasses, low shrubs, wild plants) found in meadows and heathland."
            }
            LandUseClass::Highway => {
                "Roads and highways: paved surfaces for road transport (motorways, main roads, interchanges)."
            }
            LandUseClass::Industrial => {
                "Industrial areas: factories, warehouses, power plants and storage yards. Large built-up surfaces."
            }
            LandUseClass::Pasture => {
                "Pasture: grassland used to feed livestock (cattle, sheep, horses). Agricultural purpose."
            }
            LandUseClass::PermanentCrop => {
                "Permanent crops: plants that regrow every year without replanting (vineyards, orchards, olive groves)."
            }
            LandUseClass::Residential => {
                "Residential areas: neighbourhoods of human housing (houses, apartment blocks, estates)."
            }
            LandUseClass::River => {
                "Rivers and streams: bodies of flowing water (rivers, canals). Long and winding shapes."
            }
            LandUseClass::SeaLake => {
                "Seas and lakes: bodies of still water (seas, lakes, reservoirs). Large motionless water surfaces."
            }
        }
    }
}

impl fmt::Display for LandUseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LandUseClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|class| class.label() == s)
            .ok_or_else(|| format!("unknown land-use class `{}`", s))
    }
}
