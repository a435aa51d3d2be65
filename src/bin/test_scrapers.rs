//! Test all scrapers with a live query

use nexus::{scrapers, Registry, ResultSet, Settings};

fn print_results(name: &str, result: &ResultSet) {
    println!("\n============================================================");
    println!("  {}", name);
    println!("============================================================");

    if let Some(error) = &result.error {
        println!("  ✗ FAILED - {}", error);
        return;
    }
    if result.entries.is_empty() {
        println!("  ⚠ No results found (site unreachable or markup changed)");
        return;
    }

    println!(
        "  ✓ Found {} results ({} resolved) in {:.2}s",
        result.total,
        result.resolved_count(),
        result.time
    );
    for (i, r) in result.entries.iter().take(5).enumerate() {
        println!(
            "    {}. {} | {}",
            i + 1,
            truncate(&r.name, 45),
            r.infohash.as_deref().unwrap_or("-")
        );
    }
    if result.entries.len() > 5 {
        println!("    ... and {} more", result.entries.len() - 5);
    }
}

#[tokio::main]
async fn main() {
    let settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return;
        }
    };
    nexus::log::init_log();

    let query = std::env::args().nth(1).unwrap_or_else(|| "ubuntu".to_string());
    println!("\n🔍 Testing scrapers with query: \"{}\"", query);

    let registry = match Registry::from_settings(&settings).await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to set up sites: {}", e);
            return;
        }
    };

    let mut working = 0;
    for key in scrapers::SCRAPERS {
        let Ok(result) = registry.search(key, &query, 1, 10).await else {
            println!("\n[{}] - disabled", key);
            continue;
        };
        print_results(key, &result);
        if result.resolved_count() > 0 {
            working += 1;
        }
    }

    // Combined search
    println!("\n\n============================================================");
    println!("  COMBINED SEARCH (search_all)");
    println!("============================================================");
    let all = registry.search_all(&query, 1, 10).await;
    for (site, result) in &all {
        println!("  {:40} {:>3} results", site, result.total);
    }

    println!("\n============================================================");
    println!("  SUMMARY");
    println!("============================================================");
    println!("  {} of {} scrapers returned results", working, registry.len());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max - 3).collect::<String>())
    }
}
