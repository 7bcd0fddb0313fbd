//! Line-oriented operator shell
//!
//! Stands in for the register screen: cart handling, checkout, product entry,
//! reports and cashier login, one command per line.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use smartpos_core::auth::{CashierRecord, Role};
use smartpos_core::money::format_money;
use smartpos_core::{
    Cart, CoreError, HoldOutcome, PaymentMethod, Product, ProductDraft, ReceiptLayout,
    ReceiptPrinter, SaleRecord, SalesLedger,
};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::auth::CredentialStore;
use crate::catalog_service::{CatalogHandle, ProductArrived};
use crate::product_entry::ProductEntry;

const ADMIN_REQUIRED: &str = "⛔ Admin login required.";

const HELP: &str = "\
Commands:
  products                      list the catalog
  search <text>                 find products by name
  scan <barcode>                add a product by barcode
  add <name>                    add one unit to the cart
  remove <name>                 remove a line from the cart
  inc <name> | dec <name>       change a line by one
  qty <name> <delta>            change a line by delta
  cart                          show the cart and totals
  checkout [cash|card]          complete the sale
  hold                          hold the current order
  new name|barcode|price|vat|description|image
                                enter a new product (admin)
  sales [YYYY-MM-DD|today]      sales summary
  login <username> <password>   switch cashier
  cashier add <name> <username> <password>
                                create an account (admin; the
                                first account becomes admin)
  quit                          exit";

/// One parsed shell line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Help,
    Products,
    Search(String),
    Scan(String),
    Add(String),
    Remove(String),
    ChangeQuantity { name: String, delta: i64 },
    Cart,
    Checkout(PaymentMethod),
    Hold,
    New(ProductDraft),
    Sales(Option<NaiveDate>),
    Login { username: String, password: String },
    AddCashier {
        name: String,
        username: String,
        password: String,
    },
    Quit,
}

/// Parse one input line
pub fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb.to_ascii_lowercase().as_str() {
        "help" | "?" => Ok(ShellCommand::Help),
        "products" | "list" => Ok(ShellCommand::Products),
        "search" => Ok(ShellCommand::Search(rest.to_string())),
        "scan" => required(rest, "scan <barcode>").map(ShellCommand::Scan),
        "add" => required(rest, "add <name>").map(ShellCommand::Add),
        "remove" | "rm" => required(rest, "remove <name>").map(ShellCommand::Remove),
        "inc" => required(rest, "inc <name>")
            .map(|name| ShellCommand::ChangeQuantity { name, delta: 1 }),
        "dec" => required(rest, "dec <name>")
            .map(|name| ShellCommand::ChangeQuantity { name, delta: -1 }),
        "qty" => parse_qty(rest),
        "cart" => Ok(ShellCommand::Cart),
        "checkout" | "pay" => {
            let method = if rest.is_empty() {
                PaymentMethod::Cash
            } else {
                PaymentMethod::from_str(rest).map_err(|e| e.to_string())?
            };
            Ok(ShellCommand::Checkout(method))
        }
        "hold" => Ok(ShellCommand::Hold),
        "new" => parse_new(rest),
        "sales" => parse_sales(rest),
        "login" => match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
            [username, password] => Ok(ShellCommand::Login {
                username: username.to_string(),
                password: password.to_string(),
            }),
            _ => Err("Usage: login <username> <password>".to_string()),
        },
        "cashier" => parse_cashier(rest),
        "quit" | "exit" => Ok(ShellCommand::Quit),
        "" => Err("Empty command".to_string()),
        other => Err(format!("Unknown command: {other} (try 'help')")),
    }
}

fn required(rest: &str, usage: &str) -> Result<String, String> {
    if rest.is_empty() {
        Err(format!("Usage: {usage}"))
    } else {
        Ok(rest.to_string())
    }
}

fn parse_qty(rest: &str) -> Result<ShellCommand, String> {
    let usage = || "Usage: qty <name> <delta>".to_string();
    let (name, delta) = rest.rsplit_once(char::is_whitespace).ok_or_else(usage)?;
    let delta = delta.parse::<i64>().map_err(|_| usage())?;
    let name = name.trim();
    if name.is_empty() {
        return Err(usage());
    }
    Ok(ShellCommand::ChangeQuantity {
        name: name.to_string(),
        delta,
    })
}

fn parse_new(rest: &str) -> Result<ShellCommand, String> {
    if rest.is_empty() {
        return Err("Usage: new name|barcode|price|vat|description|image".to_string());
    }
    let mut fields = rest.split('|').map(str::trim);
    let mut next = || fields.next().unwrap_or_default().to_string();

    let name = next();
    let barcode = next();
    let price = next();
    let vat = next();
    let description = next();
    let image = next();

    Ok(ShellCommand::New(ProductDraft {
        name,
        barcode,
        price,
        vat,
        description,
        image_path: (!image.is_empty()).then(|| PathBuf::from(image)),
    }))
}

fn parse_sales(rest: &str) -> Result<ShellCommand, String> {
    match rest {
        "" => Ok(ShellCommand::Sales(None)),
        "today" => Ok(ShellCommand::Sales(Some(Local::now().date_naive()))),
        date => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(|d| ShellCommand::Sales(Some(d)))
            .map_err(|_| format!("Invalid date: {date} (expected YYYY-MM-DD)")),
    }
}

fn parse_cashier(rest: &str) -> Result<ShellCommand, String> {
    let usage = || "Usage: cashier add <name> <username> <password>".to_string();
    let mut words: Vec<&str> = rest.split_whitespace().collect();
    if words.len() < 4 || !words[0].eq_ignore_ascii_case("add") {
        return Err(usage());
    }
    words.remove(0);
    let password = words.pop().unwrap_or_default().to_string();
    let username = words.pop().unwrap_or_default().to_string();
    Ok(ShellCommand::AddCashier {
        name: words.join(" "),
        username,
        password,
    })
}

/// Result of executing a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Reply(String),
    Quit,
}

/// Settings the shell starts with
#[derive(Debug, Clone)]
pub struct ShellSettings {
    pub tax_rate: rust_decimal::Decimal,
    pub layout: ReceiptLayout,
    pub cashier: String,
}

pub struct Shell {
    cart: Cart,
    catalog: CatalogHandle,
    entry: ProductEntry,
    ledger: SalesLedger,
    credentials: CredentialStore,
    printer: Box<dyn ReceiptPrinter>,
    layout: ReceiptLayout,
    /// Name recorded on sales
    cashier: String,
    /// Account logged in through `login`, if any
    session: Option<CashierRecord>,
}

impl Shell {
    pub fn new(
        catalog: CatalogHandle,
        entry: ProductEntry,
        ledger: SalesLedger,
        credentials: CredentialStore,
        printer: Box<dyn ReceiptPrinter>,
        settings: ShellSettings,
    ) -> Self {
        Self {
            cart: Cart::with_tax_rate(settings.tax_rate),
            catalog,
            entry,
            ledger,
            credentials,
            printer,
            layout: settings.layout,
            cashier: settings.cashier,
            session: None,
        }
    }

    #[cfg(test)]
    fn cart(&self) -> &Cart {
        &self.cart
    }

    #[cfg(test)]
    fn cashier(&self) -> &str {
        &self.cashier
    }

    fn is_admin(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.role.is_admin())
    }

    /// Read lines until `quit`, end of input or cancellation
    ///
    /// Product arrivals from peers are printed as they come in.
    pub async fn run(
        mut self,
        mut input: mpsc::Receiver<String>,
        mut arrivals: broadcast::Receiver<ProductArrived>,
        cancel: CancellationToken,
    ) {
        println!("SmartPOS ready. Cashier: {}. Type 'help' for commands.", self.cashier);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                line = input.recv() => {
                    let Some(line) = line else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match parse_command(&line) {
                        Ok(command) => match self.execute(command).await {
                            Step::Reply(text) => println!("{text}"),
                            Step::Quit => break,
                        },
                        Err(usage) => println!("{usage}"),
                    }
                }
                arrival = arrivals.recv() => match arrival {
                    Ok(ProductArrived { name, price }) => {
                        println!("📦 New product arrived: {} (Ksh {})", name, format_money(price));
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        debug!("Missed {} arrival notifications", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        debug!("Shell stopped");
    }

    /// Execute one command against the cart, catalog and stores
    pub async fn execute(&mut self, command: ShellCommand) -> Step {
        let reply = match command {
            ShellCommand::Help => HELP.to_string(),
            ShellCommand::Products => match self.catalog.products().await {
                Ok(products) if products.is_empty() => "Catalog is empty.".to_string(),
                Ok(products) => product_table(&products),
                Err(e) => format!("⚠️ {e}"),
            },
            ShellCommand::Search(query) => match self.catalog.search(&query).await {
                Ok(found) if found.is_empty() => format!("No products match '{query}'."),
                Ok(found) => product_table(&found),
                Err(e) => format!("⚠️ {e}"),
            },
            ShellCommand::Scan(code) => self.scan(&code).await,
            ShellCommand::Add(name) => match self.catalog.find_by_name(&name).await {
                Ok(Some(product)) => {
                    let quantity = self.cart.add(&product);
                    format!("Added {} (x{})", product.name, quantity)
                }
                Ok(None) => CoreError::ProductNotFound(name).to_string(),
                Err(e) => format!("⚠️ {e}"),
            },
            ShellCommand::Remove(name) => {
                if self.cart.remove(&name) {
                    format!("Removed {name}")
                } else {
                    format!("Not in cart: {name}")
                }
            }
            ShellCommand::ChangeQuantity { name, delta } => {
                if self.cart.line(&name).is_none() {
                    format!("Not in cart: {name}")
                } else {
                    match self.cart.change_quantity(&name, delta) {
                        Some(quantity) => format!("{name} x{quantity}"),
                        None => format!("Removed {name}"),
                    }
                }
            }
            ShellCommand::Cart => self.cart_view(),
            ShellCommand::Checkout(method) => self.checkout(method),
            ShellCommand::Hold => match self.cart.hold_order() {
                HoldOutcome::Empty => "Nothing to hold.".to_string(),
                HoldOutcome::NotPersisted { lines } => format!(
                    "⏸️ Order held for later ({lines} lines). Held orders are not saved and cannot be resumed yet."
                ),
            },
            ShellCommand::New(_) if !self.is_admin() => ADMIN_REQUIRED.to_string(),
            ShellCommand::New(draft) => match self.entry.save(&draft).await {
                Ok(saved) => match saved.broadcast_error {
                    None => format!(
                        "✅ {} saved and broadcasted successfully.",
                        saved.product.name
                    ),
                    Some(e) => format!(
                        "✅ {} saved. ⚠️ Network broadcast failed: {e}",
                        saved.product.name
                    ),
                },
                Err(CoreError::DuplicateProduct(name)) => {
                    format!("⚠️ A product named '{name}' already exists.")
                }
                Err(e) => format!("⚠️ {e}"),
            },
            ShellCommand::Sales(date) => {
                let summary = match date {
                    Some(date) => self.ledger.summary_for(date),
                    None => self.ledger.summary(),
                };
                format!(
                    "Transactions: {}\nTotal sales: Ksh {}\nLast sale: {}",
                    summary.transactions,
                    format_money(summary.total_sales),
                    summary.last_sale_display()
                )
            }
            ShellCommand::Login { username, password } => {
                match self.credentials.verify(&username, &password).await {
                    Ok(record) => {
                        self.cashier = record.name.clone();
                        let reply = format!("Logged in as {} ({})", record.name, record.role);
                        self.session = Some(record);
                        reply
                    }
                    Err(_) => "Invalid username or password.".to_string(),
                }
            }
            ShellCommand::AddCashier {
                name,
                username,
                password,
            } => {
                // First account on a fresh terminal administers it
                let role = if self.credentials.is_unclaimed().await {
                    Some(Role::Admin)
                } else if self.is_admin() {
                    Some(Role::Cashier)
                } else {
                    None
                };
                match role {
                    None => ADMIN_REQUIRED.to_string(),
                    Some(role) => match self
                        .credentials
                        .add_cashier(&name, &username, &password, role)
                        .await
                    {
                        Ok(()) => format!("Cashier {username} added ({role})."),
                        Err(e) => format!("⚠️ {e}"),
                    },
                }
            }
            ShellCommand::Quit => return Step::Quit,
        };
        Step::Reply(reply)
    }

    async fn scan(&mut self, code: &str) -> String {
        let product = match self.catalog.find_by_barcode(code).await {
            Ok(Some(product)) => product,
            Ok(None) => match self.catalog.search(code).await {
                Ok(found) if found.len() == 1 => found[0].clone(),
                Ok(found) if found.len() > 1 => {
                    return format!("Several products match:\n{}", product_table(&found));
                }
                Ok(_) => return "❌ Barcode not found.".to_string(),
                Err(e) => return format!("⚠️ {e}"),
            },
            Err(e) => return format!("⚠️ {e}"),
        };
        self.cart.add(&product);
        format!("✅ Scanned: {} added to cart", product.name)
    }

    fn cart_view(&self) -> String {
        if self.cart.is_empty() {
            return "Cart is empty.".to_string();
        }
        let mut view = String::new();
        for line in self.cart.lines() {
            view.push_str(&format!(
                "{:<24} x{:<4} {:>12}\n",
                line.product().name,
                line.quantity(),
                format_money(line.line_total())
            ));
        }
        view.push_str(&self.cart.summary());
        view
    }

    fn checkout(&mut self, method: PaymentMethod) -> String {
        let outcome = match self
            .cart
            .checkout(method, self.printer.as_mut(), &self.layout)
        {
            Ok(outcome) => outcome,
            Err(CoreError::EmptyCart) => return "🛑 Cart is empty.".to_string(),
            Err(e) => return format!("⚠️ {e}"),
        };

        let mut reply = format!(
            "✅ {} payment complete. Total: Ksh {}",
            method,
            format_money(outcome.receipt.total)
        );
        if let Some(e) = outcome.print_error {
            reply.push_str(&format!("\n⚠️ {e}"));
        }
        let record = SaleRecord::from_receipt(&outcome.receipt, &self.cashier);
        if let Err(e) = self.ledger.append(record) {
            warn!("Sale {} not recorded: {}", outcome.receipt.number, e);
            reply.push_str(&format!("\n⚠️ Sale not recorded: {e}"));
        }
        reply
    }
}

fn product_table(products: &[Product]) -> String {
    products
        .iter()
        .map(|p| {
            format!(
                "{:<24} {:>12}  {}",
                p.name,
                format_money(p.price),
                p.barcode
            )
            .trim_end()
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_service::CatalogService;
    use crate::images::ImageStore;
    use crate::replication::Broadcaster;
    use rust_decimal::Decimal;
    use smartpos_core::{Catalog, InstanceId, MemoryCatalogStore, MockPrinter};
    use std::fs;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command("help"), Ok(ShellCommand::Help));
        assert_eq!(parse_command("  CART "), Ok(ShellCommand::Cart));
        assert_eq!(parse_command("hold"), Ok(ShellCommand::Hold));
        assert_eq!(parse_command("quit"), Ok(ShellCommand::Quit));
        assert_eq!(
            parse_command("add Milk 1L"),
            Ok(ShellCommand::Add("Milk 1L".to_string()))
        );
        assert_eq!(
            parse_command("scan 6001"),
            Ok(ShellCommand::Scan("6001".to_string()))
        );
        assert!(parse_command("add").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(
            parse_command("qty Milk 1L -2"),
            Ok(ShellCommand::ChangeQuantity {
                name: "Milk 1L".to_string(),
                delta: -2
            })
        );
        assert_eq!(
            parse_command("dec Bread"),
            Ok(ShellCommand::ChangeQuantity {
                name: "Bread".to_string(),
                delta: -1
            })
        );
        assert!(parse_command("qty Milk lots").is_err());
    }

    #[test]
    fn test_parse_checkout() {
        assert_eq!(
            parse_command("checkout"),
            Ok(ShellCommand::Checkout(PaymentMethod::Cash))
        );
        assert_eq!(
            parse_command("checkout CARD"),
            Ok(ShellCommand::Checkout(PaymentMethod::Card))
        );
        assert!(parse_command("checkout bitcoin").is_err());
    }

    #[test]
    fn test_parse_new_product() {
        let parsed = parse_command("new Sugar 1kg|6001|250||Fine sugar|").unwrap();
        let ShellCommand::New(draft) = parsed else {
            panic!("expected new product");
        };
        assert_eq!(draft.name, "Sugar 1kg");
        assert_eq!(draft.barcode, "6001");
        assert_eq!(draft.price, "250");
        assert_eq!(draft.vat, "");
        assert_eq!(draft.description, "Fine sugar");
        assert!(draft.image_path.is_none());

        let ShellCommand::New(short) = parse_command("new Salt|").unwrap() else {
            panic!("expected new product");
        };
        assert_eq!(short.name, "Salt");
        assert_eq!(short.price, "");
    }

    #[test]
    fn test_parse_sales_and_accounts() {
        assert_eq!(parse_command("sales"), Ok(ShellCommand::Sales(None)));
        assert_eq!(
            parse_command("sales 2025-03-14"),
            Ok(ShellCommand::Sales(NaiveDate::from_ymd_opt(2025, 3, 14)))
        );
        assert!(parse_command("sales yesterday").is_err());
        assert_eq!(
            parse_command("cashier add Jane Doe jane pa55"),
            Ok(ShellCommand::AddCashier {
                name: "Jane Doe".to_string(),
                username: "jane".to_string(),
                password: "pa55".to_string()
            })
        );
        assert!(parse_command("cashier add jane pa55").is_err());
        assert!(parse_command("login jane").is_err());
    }

    struct Fixture {
        shell: Shell,
        dir: tempfile::TempDir,
    }

    fn fixture(products: Vec<Product>, printer: MockPrinter) -> Fixture {
        fixture_in(tempfile::tempdir().unwrap(), products, printer)
    }

    fn fixture_in(dir: tempfile::TempDir, products: Vec<Product>, printer: MockPrinter) -> Fixture {
        let images = ImageStore::new(dir.path()).unwrap();
        let id = InstanceId::generate();
        let (catalog, _task) = CatalogService::spawn(
            Catalog::from_products(products),
            Box::new(MemoryCatalogStore::new()),
            images.clone(),
            id,
        );
        let entry = ProductEntry::new(
            catalog.clone(),
            images,
            Broadcaster::new("127.0.0.1:9".parse().unwrap()),
            id,
        );
        let shell = Shell::new(
            catalog,
            entry,
            SalesLedger::open(dir.path().join("sales_data.json")),
            CredentialStore::open(dir.path().join("cashiers.json")),
            Box::new(printer),
            ShellSettings {
                tax_rate: smartpos_core::default_tax_rate(),
                layout: ReceiptLayout::default(),
                cashier: "Admin".to_string(),
            },
        );
        Fixture { shell, dir }
    }

    fn catalog() -> Vec<Product> {
        vec![
            Product::new("Milk 1L", Decimal::from(120)).with_barcode("6001"),
            Product::new("Bread", Decimal::from(80)).with_barcode("6002"),
        ]
    }

    async fn run(shell: &mut Shell, line: &str) -> String {
        match shell.execute(parse_command(line).unwrap()).await {
            Step::Reply(text) => text,
            Step::Quit => "<quit>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sale_flow() {
        let Fixture { mut shell, dir: _dir } = fixture(catalog(), MockPrinter::new());

        assert_eq!(
            run(&mut shell, "scan 6001").await,
            "✅ Scanned: Milk 1L added to cart"
        );
        run(&mut shell, "add Milk 1L").await;
        run(&mut shell, "add Bread").await;
        assert_eq!(shell.cart().subtotal(), Decimal::from(320));

        let view = run(&mut shell, "cart").await;
        assert!(view.contains("Total: Ksh 371.20"));

        let reply = run(&mut shell, "checkout cash").await;
        assert_eq!(reply, "✅ Cash payment complete. Total: Ksh 371.20");
        assert!(shell.cart().is_empty());

        let sales = run(&mut shell, "sales").await;
        assert!(sales.starts_with("Transactions: 1\nTotal sales: Ksh 371.20"));
    }

    #[tokio::test]
    async fn test_scan_unknown_and_fallback() {
        let Fixture { mut shell, dir: _dir } = fixture(catalog(), MockPrinter::new());
        assert_eq!(run(&mut shell, "scan 9999").await, "❌ Barcode not found.");
        assert_eq!(
            run(&mut shell, "scan bread").await,
            "✅ Scanned: Bread added to cart"
        );
    }

    #[tokio::test]
    async fn test_checkout_empty_cart() {
        let Fixture { mut shell, dir: _dir } = fixture(catalog(), MockPrinter::new());
        assert_eq!(run(&mut shell, "checkout").await, "🛑 Cart is empty.");
        assert!(run(&mut shell, "sales").await.starts_with("Transactions: 0"));
    }

    #[tokio::test]
    async fn test_print_failure_still_records_sale() {
        let Fixture { mut shell, dir: _dir } =
            fixture(catalog(), MockPrinter::failing("Printer offline"));
        run(&mut shell, "add Bread").await;

        let reply = run(&mut shell, "checkout card").await;
        assert!(reply.contains("Print failed: Printer offline"));
        assert!(shell.cart().is_empty());
        assert!(run(&mut shell, "sales").await.starts_with("Transactions: 1"));
    }

    #[tokio::test]
    async fn test_quantity_changes() {
        let Fixture { mut shell, dir: _dir } = fixture(catalog(), MockPrinter::new());
        run(&mut shell, "add Bread").await;
        assert_eq!(run(&mut shell, "inc Bread").await, "Bread x2");
        assert_eq!(run(&mut shell, "qty Bread -2").await, "Removed Bread");
        assert_eq!(run(&mut shell, "dec Bread").await, "Not in cart: Bread");

        run(&mut shell, "add Milk 1L").await;
        assert_eq!(run(&mut shell, "dec Milk 1L").await, "Removed Milk 1L");
        assert!(shell.cart().is_empty());
    }

    #[tokio::test]
    async fn test_hold_does_not_clear_cart() {
        let Fixture { mut shell, dir: _dir } = fixture(catalog(), MockPrinter::new());
        assert_eq!(run(&mut shell, "hold").await, "Nothing to hold.");
        run(&mut shell, "add Bread").await;
        assert!(run(&mut shell, "hold").await.starts_with("⏸️ Order held"));
        assert_eq!(shell.cart().len(), 1);
    }

    async fn login_admin(shell: &mut Shell) {
        run(shell, "cashier add Store Owner owner s3cret").await;
        run(shell, "login owner s3cret").await;
    }

    #[tokio::test]
    async fn test_new_product_and_duplicate() {
        let Fixture { mut shell, dir: _dir } = fixture(catalog(), MockPrinter::new());
        login_admin(&mut shell).await;
        let reply = run(&mut shell, "new Sugar 1kg|6003|250|16|Fine|").await;
        assert!(reply.starts_with("✅ Sugar 1kg saved"));
        assert!(run(&mut shell, "products").await.contains("Sugar 1kg"));

        let reply = run(&mut shell, "new Bread||90|||").await;
        assert_eq!(reply, "⚠️ A product named 'Bread' already exists.");

        let reply = run(&mut shell, "new |||||").await;
        assert_eq!(reply, "⚠️ Please enter product name.");
    }

    #[tokio::test]
    async fn test_login_switches_cashier() {
        let Fixture { mut shell, dir: _dir } = fixture(catalog(), MockPrinter::new());
        let reply = run(&mut shell, "cashier add Jane Doe jane pa55").await;
        assert_eq!(reply, "Cashier jane added (Admin).");

        assert_eq!(
            run(&mut shell, "login jane wrong").await,
            "Invalid username or password."
        );
        assert_eq!(
            run(&mut shell, "login jane pa55").await,
            "Logged in as Jane Doe (Admin)"
        );
        assert_eq!(shell.cashier(), "Jane Doe");
    }

    #[tokio::test]
    async fn test_admin_only_commands() {
        let Fixture { mut shell, dir: _dir } = fixture(catalog(), MockPrinter::new());
        assert_eq!(run(&mut shell, "new Salt||40|||").await, ADMIN_REQUIRED);

        login_admin(&mut shell).await;
        assert_eq!(
            run(&mut shell, "cashier add Sam Till sam pa55").await,
            "Cashier sam added (Cashier)."
        );

        assert!(run(&mut shell, "login sam pa55").await.ends_with("(Cashier)"));
        assert_eq!(run(&mut shell, "new Salt||40|||").await, ADMIN_REQUIRED);
        assert_eq!(run(&mut shell, "cashier add Eve Bad eve x").await, ADMIN_REQUIRED);
        assert!(!run(&mut shell, "products").await.contains("Salt"));
    }

    #[tokio::test]
    async fn test_unreadable_accounts_do_not_grant_admin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cashiers.json");
        fs::write(&path, "{\"Username\": ").unwrap();
        let Fixture { mut shell, dir } = fixture_in(dir, catalog(), MockPrinter::new());

        assert_eq!(
            run(&mut shell, "cashier add Mallory M mallory x").await,
            ADMIN_REQUIRED
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("cashiers.json.bak")).unwrap(),
            "{\"Username\": "
        );
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_run_stops_on_quit() {
        let Fixture { shell, dir: _dir } = fixture(catalog(), MockPrinter::new());
        let (tx, rx) = mpsc::channel(8);
        let (events, _) = broadcast::channel(4);
        tx.send("add Bread".to_string()).await.unwrap();
        tx.send("quit".to_string()).await.unwrap();

        let task = tokio::spawn(shell.run(rx, events.subscribe(), CancellationToken::new()));
        tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }
}
