/// Shardsearch API Demo
///
/// Demonstrates the dataset operations:
/// - Building a partitioned dataset from JSON records
/// - Search (parsed, term, prefix, fuzzy, phrase)
/// - Facets and existence checks
/// - Filtering and closing

use serde_json::json;
use shardsearch::{converter, Dataset, IndexConfig, StorageLevel};
use std::collections::BTreeMap;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n╔═══════════════════════════════════════════════╗");
    println!("║      Shardsearch - Distributed Search Demo    ║");
    println!("╚═══════════════════════════════════════════════╝\n");

    // Step 1: Build dataset
    println!("Step 1: Building dataset...");
    let records = vec![
        json!({"title": "Rust Programming", "body": "Learn the Rust language", "category": "books", "year": 2021}),
        json!({"title": "Database Systems", "body": "SQL and NoSQL databases", "category": "books", "year": 2015}),
        json!({"title": "Web Development", "body": "Building web apps in Rust", "category": "courses", "year": 2019}),
        json!({"title": "Search Engines", "body": "Inverted indexes and ranking", "category": "books", "year": 2010}),
    ];
    let ds = Dataset::builder(converter::<serde_json::Value>())
        .config(IndexConfig::default())
        .partitions(2)
        .name("library")
        .build(records)?;
    ds.persist(StorageLevel::MemoryOnly)?;
    println!("  {} records in {} partitions ({:?})\n", ds.count()?, ds.num_partitions(), ds.state());

    // Step 2: Search
    println!("Step 2: SEARCH - Querying records...");
    for query in ["rust", "body:rust AND year:[2020 TO *]", "title:data*", "\"web apps\""] {
        let results = ds.query(query, 10)?;
        println!("  '{}': {} results", query, results.len());
        for m in results.iter() {
            println!("    {:.3}  {}", m.score, m.record["title"]);
        }
    }
    println!("  fuzzy 'rsut': {} results", ds.fuzzy_query("body", "rsut", 1, 10)?.len());
    println!();

    // Step 3: Facets
    println!("Step 3: FACETS - Counting categories...");
    let table = ds.facet_query("*:*", "category", 10)?;
    for (value, count) in table.sorted("category") {
        println!("  {}: {}", value, count);
    }
    println!();

    // Step 4: Exists
    println!("Step 4: EXISTS - Checking for records...");
    let mut fields = BTreeMap::new();
    fields.insert("category".to_string(), "courses".to_string());
    println!("  category=courses: {}", ds.exists(&fields)?);
    println!();

    // Step 5: Filter
    println!("Step 5: FILTER - Deriving a dataset...");
    let books = ds.filter(|r| r["category"] == "books")?;
    println!("  books: {} records ({:?})", books.count()?, books.state());
    println!();

    // Step 6: Close
    println!("Step 6: CLOSE");
    ds.close();
    books.close();
    println!("  state: {:?}", ds.state());

    println!("\nDemo complete!");
    Ok(())
}
