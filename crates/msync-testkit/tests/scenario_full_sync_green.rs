//! End-to-end green path: raw grid -> parser -> reconciler -> catalog.

use msync_reconcile::{reconcile, SyncAction};
use msync_sheet::parser::{parse_table, ParseConfig};
use msync_testkit::MemoryCatalog;

fn grid() -> Vec<Vec<String>> {
    let rows: Vec<Vec<&str>> = vec![
        vec![
            "Restaurant", "Item", "Price", "Category", "Description", "Image", "Available",
        ],
        vec![
            "Mama's Kitchen",
            "Nsima",
            "MK 1,500",
            "Main Dishes",
            "",
            "",
            "",
            "Blantyre",
            "Traditional",
            "4.8",
            "",
        ],
        vec![
            "Mama's Kitchen",
            "Chambo",
            "MK 3,000",
            "Fish",
            "Fresh from the lake",
            "chambo.jpg",
            "",
        ],
        vec!["Lake View Cafe", "Tea", "MK 500", "Drinks", "", "", "FALSE"],
    ];
    rows.into_iter()
        .map(|r| r.into_iter().map(str::to_string).collect())
        .collect()
}

#[tokio::test]
async fn full_sync_creates_restaurants_menus_and_items() {
    let snapshot = parse_table(&grid(), &ParseConfig::new("https://img.example"));
    assert_eq!(snapshot.restaurants.len(), 2);
    assert_eq!(snapshot.total_items(), 3);

    let catalog = MemoryCatalog::new();
    let report = reconcile(&catalog, &snapshot).await;

    assert!(report.is_clean(), "failures: {:?}", report.failures);
    assert_eq!(report.synced_count(), 2);
    assert!(report
        .synced
        .iter()
        .all(|s| s.action == SyncAction::Created));

    // Remote side now holds both restaurants, one menu each, items bulked in.
    assert_eq!(catalog.restaurant_count(), 2);

    let mamas_id = catalog.id_of("Mama's Kitchen").expect("created remotely");
    let menus = catalog.menus_of(&mamas_id);
    assert_eq!(menus.len(), 1);
    assert_eq!(menus[0].name, "Main Menu");

    let items = catalog.items_in_menu(&menus[0].id);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].name, "Nsima");
    assert_eq!(items[1].name, "Chambo");
    assert_eq!(items[1].image, "https://img.example/chambo.jpg");

    let cafe_id = catalog.id_of("Lake View Cafe").unwrap();
    let cafe_menu = &catalog.menus_of(&cafe_id)[0];
    let cafe_items = catalog.items_in_menu(&cafe_menu.id);
    assert_eq!(cafe_items.len(), 1);
    assert!(!cafe_items[0].available, "literal FALSE => unavailable");
}
