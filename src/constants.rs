//! Column and table names shared across the codebase.
//! The defaults in [`crate::config::PipelineConfig`] are assembled from these.

pub const DEFAULT_SOURCE_URL: &str =
    "https://raw.githubusercontent.com/DarcyZeng1/HouseData/main/Bangalore.csv";

/// Marks "unknown" in the source data. Not the same as absent or false.
pub const SENTINEL: &str = "9";

pub const PRICE_MAX: i64 = 75_000_000;
pub const AREA_MAX: i64 = 5_000;

// Source column names
pub const PRICE: &str = "Price";
pub const AREA: &str = "Area";
pub const LOCATION: &str = "Location";
pub const BEDROOMS_RAW: &str = "No. of Bedrooms";
pub const LIFT_AVAILABLE: &str = "LiftAvailable";
pub const VAASTU_COMPLIANT: &str = "VaastuCompliant";

// Renamed columns
pub const BEDROOMS: &str = "NumOfBedrooms";

/// Source name -> cleaned name.
pub const RENAMES: &[(&str, &str)] = &[
    (BEDROOMS_RAW, BEDROOMS),
    ("Children'splayarea", "ChildrenPlayArea"),
    ("Gasconnection", "GasConnection"),
    ("BED", "Bed"),
    ("ClubHouse", "Clubhouse"),
];

// Derived columns
pub const SURROGATE_KEY: &str = "SurrogateKey";
pub const AREA_CATEGORY: &str = "Area Category";
pub const PRICE_PER_SQFT: &str = "Price per Square ft";
pub const AREA_LABELS: [&str; 3] = ["Small", "Medium", "Large"];

// Fact table
pub const SALE_ID: &str = "SaleID";
pub const FACT_COLUMNS: &[&str] = &[LOCATION, AREA, PRICE];

pub const HOUSEHOLD_COLUMNS: &[&str] = &[
    "WashingMachine",
    "AC",
    "Microwave",
    "TV",
    "Wardrobe",
    "Refrigerator",
];
pub const OUTDOOR_COLUMNS: &[&str] = &[
    "SwimmingPool",
    "LandscapedGardens",
    "JoggingTrack",
    "RainWaterHarvesting",
];
pub const COMMUNITY_COLUMNS: &[&str] = &["ShoppingMall", "SportsFacility", "School", "Hospital"];
pub const INDOOR_COLUMNS: &[&str] = &[
    BEDROOMS,
    "Gymnasium",
    "IndoorGames",
    "Clubhouse",
    "MultipurposeRoom",
    "ChildrenPlayArea",
];

pub const HOUSEHOLD_ID: &str = "HouseHoldApplianceID";
pub const OUTDOOR_ID: &str = "OutdoorAmentitiesID";
pub const COMMUNITY_ID: &str = "CommunityID";
pub const INDOOR_ID: &str = "IndoorRoomID";

// Logical sink table names
pub const ORIGINAL_TABLE: &str = "originalframe";
pub const FACT_TABLE: &str = "salespricefactstable";
pub const HOUSEHOLD_TABLE: &str = "householddimension";
pub const OUTDOOR_TABLE: &str = "outdooramentitiesdimension";
pub const COMMUNITY_TABLE: &str = "communitydimension";
pub const INDOOR_TABLE: &str = "indoorroomsdimension";

/// Get every logical table name in publish order
pub fn output_table_names() -> Vec<&'static str> {
    vec![
        ORIGINAL_TABLE,
        FACT_TABLE,
        HOUSEHOLD_TABLE,
        OUTDOOR_TABLE,
        COMMUNITY_TABLE,
        INDOOR_TABLE,
    ]
}
