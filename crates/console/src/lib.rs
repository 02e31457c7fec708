//! Interactive, menu-driven console over an [`InventoryStore`].
//!
//! The console is generic over its input and output so it can be scripted:
//! tests feed a `Cursor` and read back a `Vec<u8>`, the binary wires up
//! locked stdin/stdout. Store errors are printed and the loop continues;
//! only I/O failures on the console streams end it early.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::Arc;

use labinv_core::{ItemId, LocationId};
use labinv_infra::InventoryStore;
use labinv_inventory::{Item, ItemWithLocation, NewItem, NewLocation};

const ITEM_RULE_WIDTH: usize = 70;
const LOCATION_RULE_WIDTH: usize = 40;

/// One entry of the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Exit,
    ListItems,
    ListLocations,
    AddItem,
    AddLocation,
    Search,
    DeleteItem,
    DeleteLocation,
}

impl FromStr for Command {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" | "exit" | "quit" => Ok(Self::Exit),
            "1" => Ok(Self::ListItems),
            "2" => Ok(Self::ListLocations),
            "3" => Ok(Self::AddItem),
            "4" => Ok(Self::AddLocation),
            "5" => Ok(Self::Search),
            "6" => Ok(Self::DeleteItem),
            "7" => Ok(Self::DeleteLocation),
            _ => Err(()),
        }
    }
}

/// `y` / `yes`, any case.
fn confirmed(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub struct Console<R, W> {
    store: Arc<dyn InventoryStore>,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(store: Arc<dyn InventoryStore>, input: R, output: W) -> Self {
        Self {
            store,
            input,
            output,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Print the banner and serve commands until exit or end of input.
    pub async fn run(&mut self) -> io::Result<()> {
        self.banner().await?;

        loop {
            self.menu()?;
            let Some(line) = self.prompt("\nEnter command: ")? else {
                writeln!(self.output)?;
                return Ok(());
            };

            let Ok(command) = line.parse::<Command>() else {
                writeln!(self.output, "Unknown command")?;
                continue;
            };

            let keep_going = match command {
                Command::Exit => {
                    writeln!(self.output, "Goodbye!")?;
                    return Ok(());
                }
                Command::ListItems => self.list_items().await.map(|()| true)?,
                Command::ListLocations => self.list_locations().await.map(|()| true)?,
                Command::AddItem => self.add_item().await?,
                Command::AddLocation => self.add_location().await?,
                Command::Search => self.search().await?,
                Command::DeleteItem => self.delete_item().await?,
                Command::DeleteLocation => self.delete_location().await?,
            };

            if !keep_going {
                writeln!(self.output)?;
                return Ok(());
            }
        }
    }

    async fn banner(&mut self) -> io::Result<()> {
        writeln!(self.output, "Lab Inventory System")?;
        writeln!(self.output, "-------------------")?;
        writeln!(self.output, "Backend: {}", self.store.backend())?;

        match (self.store.list_items().await, self.store.list_locations().await) {
            (Ok(items), Ok(locations)) => {
                writeln!(self.output, "Total items: {}", items.len())?;
                writeln!(self.output, "Total locations: {}", locations.len())?;
            }
            (Err(e), _) | (_, Err(e)) => {
                writeln!(self.output, "Failed to read inventory: {e}")?;
            }
        }
        Ok(())
    }

    fn menu(&mut self) -> io::Result<()> {
        writeln!(self.output, "\nCommands:")?;
        writeln!(self.output, "1. List all items")?;
        writeln!(self.output, "2. List all locations")?;
        writeln!(self.output, "3. Add new item")?;
        writeln!(self.output, "4. Add new location")?;
        writeln!(self.output, "5. Search items")?;
        writeln!(self.output, "6. Delete item")?;
        writeln!(self.output, "7. Delete location")?;
        writeln!(self.output, "0. Exit")
    }

    /// Write `text`, then read one line; `None` at end of input.
    fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        write!(self.output, "{text}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn item_table_header(&mut self) -> io::Result<()> {
        writeln!(self.output, "{:<5} | {:<30} | {:<20} | {:<10}", "ID", "Name", "Location", "Price")?;
        writeln!(self.output, "{}", "-".repeat(ITEM_RULE_WIDTH))
    }

    fn item_row(&mut self, row: &ItemWithLocation) -> io::Result<()> {
        writeln!(
            self.output,
            "{:<5} | {:<30} | {:<20} | ${:.2}",
            row.id, row.name, row.location, row.price
        )
    }

    async fn list_items(&mut self) -> io::Result<()> {
        let rows = match self.store.items_with_locations().await {
            Ok(rows) => rows,
            Err(e) => return writeln!(self.output, "Failed to list items: {e}"),
        };

        if rows.is_empty() {
            return writeln!(self.output, "No items found");
        }

        writeln!(self.output, "\nAll Items:")?;
        self.item_table_header()?;
        for row in &rows {
            self.item_row(row)?;
        }
        Ok(())
    }

    async fn list_locations(&mut self) -> io::Result<()> {
        let locations = match self.store.list_locations().await {
            Ok(l) => l,
            Err(e) => return writeln!(self.output, "Failed to list locations: {e}"),
        };

        if locations.is_empty() {
            return writeln!(self.output, "No locations found");
        }

        writeln!(self.output, "\nAll Locations:")?;
        writeln!(self.output, "{:<5} | {:<30}", "ID", "Name")?;
        writeln!(self.output, "{}", "-".repeat(LOCATION_RULE_WIDTH))?;
        for location in &locations {
            writeln!(self.output, "{:<5} | {:<30}", location.id, location.name)?;
        }
        Ok(())
    }

    /// Returns `false` when input ended mid-dialogue.
    async fn add_item(&mut self) -> io::Result<bool> {
        let locations = match self.store.list_locations().await {
            Ok(l) => l,
            Err(e) => {
                writeln!(self.output, "Failed to list locations: {e}")?;
                return Ok(true);
            }
        };
        if locations.is_empty() {
            writeln!(self.output, "No locations available. Please add a location first.")?;
            return Ok(true);
        }

        writeln!(self.output, "\nAvailable Locations:")?;
        for location in &locations {
            writeln!(self.output, "{}. {}", location.id, location.name)?;
        }

        let Some(name) = self.prompt("\nEnter item name: ")? else {
            return Ok(false);
        };
        if name.trim().is_empty() {
            writeln!(self.output, "Item name cannot be empty")?;
            return Ok(true);
        }

        let Some(raw) = self.prompt("Enter location ID: ")? else {
            return Ok(false);
        };
        let Ok(location_id) = raw.parse::<LocationId>() else {
            writeln!(self.output, "Invalid location ID")?;
            return Ok(true);
        };
        if !locations.iter().any(|l| l.id == location_id) {
            writeln!(self.output, "Location with that ID does not exist")?;
            return Ok(true);
        }

        let Some(raw) = self.prompt("Enter price: ")? else {
            return Ok(false);
        };
        let Ok(price) = raw.trim().parse::<f64>() else {
            writeln!(self.output, "Invalid price")?;
            return Ok(true);
        };

        let Some(raw) = self.prompt("Enter quantity (blank to skip): ")? else {
            return Ok(false);
        };
        let mut new = NewItem::new(name, location_id, price);
        if !raw.trim().is_empty() {
            let Ok(number) = raw.trim().parse::<u32>() else {
                writeln!(self.output, "Invalid quantity")?;
                return Ok(true);
            };
            new = new.with_number(number);
        }

        match self.store.create_item(new).await {
            Ok(item) => writeln!(self.output, "Item added successfully with ID {}", item.id)?,
            Err(e) => writeln!(self.output, "Failed to add item: {e}")?,
        }
        Ok(true)
    }

    async fn add_location(&mut self) -> io::Result<bool> {
        let Some(name) = self.prompt("\nEnter location name: ")? else {
            return Ok(false);
        };
        if name.trim().is_empty() {
            writeln!(self.output, "Location name cannot be empty")?;
            return Ok(true);
        }

        match self.store.create_location(NewLocation::new(name)).await {
            Ok(location) => {
                writeln!(self.output, "Location added successfully with ID {}", location.id)?
            }
            Err(e) => writeln!(self.output, "Failed to add location: {e}")?,
        }
        Ok(true)
    }

    async fn search(&mut self) -> io::Result<bool> {
        let Some(query) = self.prompt("\nEnter search term: ")? else {
            return Ok(false);
        };

        let items = match self.store.search_items(&query).await {
            Ok(items) => items,
            Err(e) => {
                writeln!(self.output, "Search failed: {e}")?;
                return Ok(true);
            }
        };
        if items.is_empty() {
            writeln!(self.output, "No items found matching your search")?;
            return Ok(true);
        }

        let names: HashMap<LocationId, String> = match self.store.list_locations().await {
            Ok(locations) => locations.into_iter().map(|l| (l.id, l.name)).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "could not resolve location names");
                HashMap::new()
            }
        };

        writeln!(self.output, "\nFound {} items:", items.len())?;
        self.item_table_header()?;
        for item in &items {
            let row = join(item, &names);
            self.item_row(&row)?;
        }
        Ok(true)
    }

    async fn delete_item(&mut self) -> io::Result<bool> {
        let Some(raw) = self.prompt("\nEnter item ID to delete: ")? else {
            return Ok(false);
        };
        let Ok(id) = raw.parse::<ItemId>() else {
            writeln!(self.output, "Invalid item ID")?;
            return Ok(true);
        };

        let Some(answer) = self.prompt("Are you sure you want to delete this item? (y/n): ")? else {
            return Ok(false);
        };
        if !confirmed(&answer) {
            writeln!(self.output, "Deletion cancelled")?;
            return Ok(true);
        }

        match self.store.delete_item(id).await {
            Ok(()) => writeln!(self.output, "Item deleted successfully")?,
            Err(e) => writeln!(self.output, "Failed to delete item: {e}")?,
        }
        Ok(true)
    }

    async fn delete_location(&mut self) -> io::Result<bool> {
        let Some(raw) = self.prompt("\nEnter location ID to delete: ")? else {
            return Ok(false);
        };
        let Ok(id) = raw.parse::<LocationId>() else {
            writeln!(self.output, "Invalid location ID")?;
            return Ok(true);
        };

        let Some(answer) =
            self.prompt("Are you sure you want to delete this location? (y/n): ")?
        else {
            return Ok(false);
        };
        if !confirmed(&answer) {
            writeln!(self.output, "Deletion cancelled")?;
            return Ok(true);
        }

        match self.store.delete_location(id).await {
            Ok(()) => writeln!(self.output, "Location deleted successfully")?,
            Err(e) => writeln!(self.output, "Failed to delete location: {e}")?,
        }
        Ok(true)
    }
}

fn join(item: &Item, names: &HashMap<LocationId, String>) -> ItemWithLocation {
    item.with_location(names.get(&item.location_id).map(String::as_str))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use labinv_infra::{InMemoryStore, sample};

    use super::*;

    async fn seeded() -> Arc<dyn InventoryStore> {
        let store: Arc<dyn InventoryStore> = Arc::new(InMemoryStore::new());
        sample::seed_if_empty(store.as_ref()).await.unwrap();
        store
    }

    async fn run_script(store: Arc<dyn InventoryStore>, script: &str) -> String {
        let mut console = Console::new(store, Cursor::new(script.as_bytes().to_vec()), Vec::new());
        console.run().await.unwrap();
        String::from_utf8(console.into_output()).unwrap()
    }

    #[test]
    fn commands_parse_from_menu_keys() {
        assert_eq!("0".parse(), Ok(Command::Exit));
        assert_eq!(" quit ".parse(), Ok(Command::Exit));
        assert_eq!("7".parse(), Ok(Command::DeleteLocation));
        assert_eq!("8".parse::<Command>(), Err(()));
        assert!(confirmed("YES"));
        assert!(!confirmed("n"));
    }

    #[tokio::test]
    async fn banner_and_exit() {
        let out = run_script(seeded().await, "0\n").await;
        assert!(out.contains("Backend: memory"));
        assert!(out.contains("Total items: 5"));
        assert!(out.contains("Total locations: 3"));
        assert!(out.ends_with("Goodbye!\n"));
    }

    #[tokio::test]
    async fn end_of_input_exits_cleanly() {
        let out = run_script(seeded().await, "2\n").await;
        assert!(out.contains("Storage Room"));
        assert!(!out.contains("Goodbye!"));
    }

    #[tokio::test]
    async fn lists_items_with_location_names() {
        let out = run_script(seeded().await, "1\nexit\n").await;
        assert!(out.contains("ID    | Name                           | Location             | Price"));
        let glue = out.lines().find(|l| l.contains("Wood Glue")).unwrap();
        assert!(glue.contains("Assembly Room"));
        assert!(glue.ends_with("$9.00"));
    }

    #[tokio::test]
    async fn unknown_command_keeps_the_loop_running() {
        let out = run_script(seeded().await, "banana\n0\n").await;
        assert!(out.contains("Unknown command"));
        assert!(out.contains("Goodbye!"));
    }

    #[tokio::test]
    async fn add_item_with_quantity() {
        let store = seeded().await;
        let out = run_script(store.clone(), "3\nSoldering Iron\n3\n24.5\n2\n0\n").await;
        assert!(out.contains("Item added successfully with ID 6"), "{out}");

        let item = store.get_item(ItemId::new(6)).await.unwrap();
        assert_eq!(item.name, "Soldering Iron");
        assert_eq!(item.location_id, LocationId::new(3));
        assert_eq!(item.number, Some(2));
    }

    #[tokio::test]
    async fn add_item_rejects_unknown_location() {
        let store = seeded().await;
        let out = run_script(store.clone(), "3\nSaw\n42\n0\n").await;
        assert!(out.contains("Location with that ID does not exist"));
        assert_eq!(store.list_items().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn add_item_without_locations() {
        let store: Arc<dyn InventoryStore> = Arc::new(InMemoryStore::new());
        let out = run_script(store, "3\n0\n").await;
        assert!(out.contains("No locations available. Please add a location first."));
    }

    #[tokio::test]
    async fn search_is_case_insensitive() {
        let out = run_script(seeded().await, "5\nWOOD\n0\n").await;
        assert!(out.contains("Found 2 items:"));
        assert!(out.contains("Plywood 2mm 900x600mm Sheet"));
        assert!(out.contains("Wood Glue"));

        let out = run_script(seeded().await, "5\nzzz\n0\n").await;
        assert!(out.contains("No items found matching your search"));
    }

    #[tokio::test]
    async fn deletes_require_confirmation() {
        let store = seeded().await;
        let out = run_script(store.clone(), "6\n4\nn\n0\n").await;
        assert!(out.contains("Deletion cancelled"));
        assert!(store.get_item(ItemId::new(4)).await.is_ok());

        let out = run_script(store.clone(), "6\n4\nY\n0\n").await;
        assert!(out.contains("Item deleted successfully"));
        assert!(store.get_item(ItemId::new(4)).await.is_err());
    }

    #[tokio::test]
    async fn referenced_location_reports_the_store_error() {
        let store = seeded().await;
        let out = run_script(store.clone(), "7\n2\nyes\n6\n4\nyes\n7\n2\nyes\n0\n").await;
        assert!(out.contains("Failed to delete location: in use"), "{out}");
        assert!(out.contains("Location deleted successfully"));
        assert_eq!(store.list_locations().await.unwrap().len(), 2);
    }
}
