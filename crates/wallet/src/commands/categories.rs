//! Category command handlers.

use tabled::Tabled;
use wallet_core::{Category, CategoryForm, CoreError, Wallet};

use crate::cli::{CategoriesArgs, CategoriesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "")]
    icon: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Color")]
    color: String,
    #[tabled(rename = "Default")]
    default: String,
    #[tabled(rename = "Active")]
    active: String,
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.into()
}

impl From<&Category> for CategoryRow {
    fn from(c: &Category) -> Self {
        Self {
            id: c.id.clone(),
            icon: c.icon.clone(),
            name: c.name.clone(),
            kind: c.kind.to_string(),
            color: c.color.clone(),
            default: yes_no(c.is_default),
            active: yes_no(c.is_active),
        }
    }
}

fn detail(c: &Category) -> String {
    output::detail_lines(&[
        ("ID", c.id.clone()),
        ("Name", format!("{} {}", c.icon, c.name)),
        ("Type", c.kind.to_string()),
        ("Color", c.color.clone()),
        ("Default", yes_no(c.is_default)),
        ("Active", yes_no(c.is_active)),
        ("Order", c.order.to_string()),
    ])
}

/// Display order, then name.
fn ordered(mut categories: Vec<Category>, active_only: bool) -> Vec<Category> {
    if active_only {
        categories.retain(|c| c.is_active);
    }
    categories.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
    categories
}

fn print_category(global: &GlobalOpts, category: &Category) {
    let out = output::render_single(&global.output, category, detail, |c| c.id.clone());
    output::print_output(&out, global.quiet);
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(
    wallet: &Wallet,
    args: CategoriesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let not_found = |e: CoreError| CliError::from(e).listed_by("categories list");

    match args.command {
        CategoriesCommand::List { kind, active } => {
            let all = util::with_spinner(
                "Loading categories...",
                global.quiet,
                wallet.categories(kind.map(Into::into)),
            )
            .await?;
            let list = ordered(all, active);
            let out = output::render_list(&global.output, &list, |c| CategoryRow::from(c), |c| {
                c.id.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CategoriesCommand::Get { id } => {
            let category = wallet.category(&id).await.map_err(not_found)?;
            print_category(global, &category);
            Ok(())
        }

        CategoriesCommand::Create {
            name,
            kind,
            color,
            icon,
        } => {
            let form = CategoryForm {
                name,
                kind: kind.into(),
                color,
                icon,
            };
            let mut notes = wallet.notifications();
            let category = wallet.submit_category(&form).await?;
            util::announce(&mut notes, global.quiet);
            print_category(global, &category);
            Ok(())
        }

        CategoriesCommand::Update {
            id,
            name,
            color,
            icon,
        } => {
            if name.is_none() && color.is_none() && icon.is_none() {
                return Err(CliError::Validation {
                    field: "category".into(),
                    reason: "nothing to change; pass --name, --color or --icon".into(),
                });
            }
            let current = wallet.category(&id).await.map_err(not_found)?;
            let form = CategoryForm {
                name: name.unwrap_or(current.name),
                kind: current.kind,
                color: color.unwrap_or(current.color),
                icon: icon.unwrap_or(current.icon),
            };
            let update = form.validate_update().map_err(CoreError::from)?;

            let mut notes = wallet.notifications();
            let category = wallet.update_category(&id, &update).await?;
            util::announce(&mut notes, global.quiet);
            print_category(global, &category);
            Ok(())
        }

        CategoriesCommand::Delete { id } => {
            if !util::confirm(
                &format!("Delete category '{id}'?"),
                "categories delete",
                global.yes,
            )? {
                return Ok(());
            }
            let mut notes = wallet.notifications();
            wallet.delete_category(&id).await.map_err(not_found)?;
            util::announce(&mut notes, global.quiet);
            Ok(())
        }

        CategoriesCommand::Activate { id } => {
            let mut notes = wallet.notifications();
            wallet.activate_category(&id).await.map_err(not_found)?;
            util::announce(&mut notes, global.quiet);
            Ok(())
        }

        CategoriesCommand::Deactivate { id } => {
            let mut notes = wallet.notifications();
            wallet.deactivate_category(&id).await.map_err(not_found)?;
            util::announce(&mut notes, global.quiet);
            Ok(())
        }

        CategoriesCommand::Reorder { ids } => {
            let mut notes = wallet.notifications();
            wallet.reorder_categories(&ids).await?;
            util::announce(&mut notes, global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use wallet_core::TransactionType;

    use super::*;

    fn category(id: &str, name: &str, order: i32, active: bool) -> Category {
        Category {
            id: id.into(),
            name: name.into(),
            slug: String::new(),
            kind: TransactionType::Expense,
            color: "#ef4444".into(),
            icon: "🍔".into(),
            is_default: false,
            is_active: active,
            user_id: None,
            order,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn ordered_by_position_then_name() {
        let list = ordered(
            vec![
                category("c", "Transporte", 2, true),
                category("b", "Saúde", 1, true),
                category("a", "Lazer", 1, false),
            ],
            false,
        );
        let ids: Vec<_> = list.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);

        let active = ordered(list, true);
        assert_eq!(active.len(), 2);
    }
}
