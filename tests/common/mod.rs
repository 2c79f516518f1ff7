#![allow(dead_code)]

use std::path::PathBuf;

const FLAGS: &[&str] = &[
    "LiftAvailable",
    "VaastuCompliant",
    "WashingMachine",
    "AC",
    "Microwave",
    "TV",
    "Wardrobe",
    "Refrigerator",
    "SwimmingPool",
    "LandscapedGardens",
    "JoggingTrack",
    "RainWaterHarvesting",
    "ShoppingMall",
    "SportsFacility",
    "School",
    "Hospital",
    "Gymnasium",
    "IndoorGames",
    "ClubHouse",
    "MultipurposeRoom",
    "Children'splayarea",
    "Gasconnection",
    "BED",
    "Resale",
];

fn listing(price: &str, area: &str, location: &str, bedrooms: &str, flag: &str, overrides: &[(&str, &str)]) -> String {
    let mut cells = vec![
        price.to_string(),
        area.to_string(),
        format!("\"{}\"", location),
        bedrooms.to_string(),
    ];
    for name in FLAGS {
        let value = overrides
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, v)| *v)
            .unwrap_or(flag);
        cells.push(value.to_string());
    }
    cells.join(",")
}

/// Eight listings. After cleaning four remain, in this order:
/// Hebbal (1000 sqft), Whitefield (500), Sector 9 (1200), JP Nagar (2000).
pub fn listings_csv() -> String {
    let mut header = vec!["Price", "Area", "Location", "No. of Bedrooms"];
    header.extend_from_slice(FLAGS);

    let rows = [
        listing("3000000", "1000", "Hebbal", "2", "0", &[]),
        // exact duplicate
        listing("3000000", "1000", "Hebbal", "2", "0", &[]),
        // unknown washing machine
        listing("4500000", "1500", "Kengeri", "3", "0", &[("WashingMachine", "9")]),
        // 9 in exempt columns is data
        listing("9", "500", "Whitefield", "9", "1", &[]),
        // over the price bound
        listing("80000000", "1200", "Hebbal", "3", "0", &[]),
        // over the area bound
        listing("2000000", "6000", "Yelahanka", "2", "1", &[]),
        listing("5000000", "1200", "Sector 9", "3", "0", &[("AC", "1")]),
        listing("6000000", "2000", "JP Nagar", "4", "1", &[]),
    ];

    let mut csv = header.join(",");
    csv.push('\n');
    for row in rows {
        csv.push_str(&row);
        csv.push('\n');
    }
    csv
}

pub fn write_fixture(dir: &std::path::Path) -> std::io::Result<PathBuf> {
    let path = dir.join("Bangalore.csv");
    std::fs::write(&path, listings_csv())?;
    Ok(path)
}
