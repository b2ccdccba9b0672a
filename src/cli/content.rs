//! `herdbook blogs` and `herdbook categories` subcommands

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Args, Subcommand};

use super::output::{clip, local_time, page_footer, print_ok, print_table};
use super::sessions::acknowledge;
use super::App;
use crate::services::api::BlogDraft;
use crate::services::policy::Resource;
use crate::services::query::{filter_items, page_count, paginate, BlogFilter, BlogSort, Page};
use crate::services::ApiClient;
use crate::types::{Blog, BlogCategoryLink, Category, HerdbookError, Result};

#[derive(Args, Debug)]
pub struct BlogsArgs {
    #[command(subcommand)]
    command: BlogsCommand,
}

#[derive(Subcommand, Debug)]
enum BlogsCommand {
    /// List posts with search, category filter and paging
    List {
        #[arg(short = 'q', long, default_value = "")]
        search: String,

        /// Only posts in this category
        #[arg(long, value_name = "ID")]
        category: Option<u64>,

        #[arg(long, value_enum, default_value_t = BlogSort::Newest)]
        sort: BlogSort,

        #[arg(long, default_value_t = 1)]
        page: usize,
    },

    /// Publish a post
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        /// Image file uploaded with the post
        #[arg(long, value_name = "FILE")]
        photo: Option<PathBuf>,
    },

    /// Change a post; omitted fields keep their current value
    Update {
        #[arg(value_name = "ID")]
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long, value_name = "FILE")]
        photo: Option<PathBuf>,
    },

    /// Delete a post
    Delete {
        #[arg(value_name = "ID")]
        id: u64,
    },

    /// Put a post in a category
    Assign {
        #[arg(long = "blog", value_name = "ID")]
        blog_id: u64,
        #[arg(long = "category", value_name = "ID")]
        category_id: u64,
    },

    /// Take a post out of a category
    Unassign {
        #[arg(long = "blog", value_name = "ID")]
        blog_id: u64,
        #[arg(long = "category", value_name = "ID")]
        category_id: u64,
    },
}

#[derive(Args, Debug)]
pub struct CategoriesArgs {
    #[command(subcommand)]
    command: CategoriesCommand,
}

#[derive(Subcommand, Debug)]
enum CategoriesCommand {
    List {
        #[arg(short = 'q', long, default_value = "")]
        search: String,
    },
    Add {
        name: String,
    },
    Update {
        #[arg(value_name = "ID")]
        id: u64,
        name: String,
    },
    Delete {
        #[arg(value_name = "ID")]
        id: u64,
    },
}

fn non_blank(field: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(HerdbookError::Validation(format!("{} cannot be empty", field)));
    }
    Ok(value.trim().to_string())
}

/// Category ids of every listed blog, fetched concurrently
async fn category_assignments(api: &ApiClient, blogs: &[Blog]) -> Result<HashMap<u64, Vec<u64>>> {
    let handles: Vec<_> = blogs
        .iter()
        .map(|blog| {
            let api = api.clone();
            let blog_id = blog.id;
            tokio::spawn(async move {
                let categories = api.blog_categories(blog_id).await?;
                let ids: Vec<u64> = categories.into_iter().map(|c| c.id).collect();
                Ok::<_, HerdbookError>((blog_id, ids))
            })
        })
        .collect();

    let mut assignments = HashMap::with_capacity(handles.len());
    for handle in handles {
        let (blog_id, ids) = handle
            .await
            .map_err(|e| HerdbookError::Network(format!("request task failed: {}", e)))??;
        assignments.insert(blog_id, ids);
    }
    Ok(assignments)
}

impl BlogsArgs {
    pub async fn run(self, app: &App) -> Result<()> {
        match self.command {
            BlogsCommand::List {
                search,
                category,
                sort,
                page,
            } => {
                app.ctx.require_view(Resource::Blog)?;
                let filter = BlogFilter {
                    category_id: category,
                };
                let (blogs, categories) = app.api.blogs_with_categories().await?;
                let assignments = match filter.category_id {
                    Some(_) => category_assignments(&app.api, &blogs).await?,
                    None => HashMap::new(),
                };

                let mut matched = filter_items(&blogs, &search, |b| filter.matches(b, &assignments));
                sort.sort(&mut matched);

                let page_size = app.config.page_size;
                if app.json {
                    return print_ok(Page::of(&matched, page, page_size));
                }

                if let Some(id) = filter.category_id {
                    let name = categories
                        .iter()
                        .find(|c| c.id == id)
                        .map(|c| c.name.as_str())
                        .unwrap_or("unknown category");
                    println!("Category: {}", name);
                }
                let rows: Vec<Vec<String>> = paginate(&matched, page, page_size)
                    .iter()
                    .map(|b| {
                        vec![
                            b.id.to_string(),
                            local_time(b.created_at),
                            clip(&b.title, 40),
                            clip(&b.content.replace('\n', " "), 50),
                        ]
                    })
                    .collect();
                print_table(&["ID", "Created", "Title", "Preview"], &rows);
                println!(
                    "{}",
                    page_footer(page, page_count(matched.len(), page_size), matched.len())
                );
                Ok(())
            }
            BlogsCommand::Add {
                title,
                content,
                photo,
            } => {
                app.ctx.require_edit(Resource::Blog)?;
                let draft = BlogDraft {
                    title: non_blank("title", title)?,
                    content: non_blank("content", content)?,
                    photo,
                };
                let message = app.api.add_blog(&draft).await?;
                acknowledge(app, message)
            }
            BlogsCommand::Update {
                id,
                title,
                content,
                photo,
            } => {
                app.ctx.require_edit(Resource::Blog)?;
                let blogs = app.api.list_blogs().await?;
                let existing = blogs
                    .into_iter()
                    .find(|b| b.id == id)
                    .ok_or_else(|| HerdbookError::Validation(format!("no blog post with id {}", id)))?;
                let draft = BlogDraft {
                    title: non_blank("title", title.unwrap_or(existing.title))?,
                    content: non_blank("content", content.unwrap_or(existing.content))?,
                    photo,
                };
                let message = app.api.update_blog(id, &draft).await?;
                acknowledge(app, message)
            }
            BlogsCommand::Delete { id } => {
                app.ctx.require_edit(Resource::Blog)?;
                let message = app.api.delete_blog(id).await?;
                acknowledge(app, message)
            }
            BlogsCommand::Assign {
                blog_id,
                category_id,
            } => {
                app.ctx.require_edit(Resource::Blog)?;
                let link = BlogCategoryLink {
                    blog_id,
                    category_id,
                };
                let message = app.api.assign_category(link).await?;
                acknowledge(app, message)
            }
            BlogsCommand::Unassign {
                blog_id,
                category_id,
            } => {
                app.ctx.require_edit(Resource::Blog)?;
                let link = BlogCategoryLink {
                    blog_id,
                    category_id,
                };
                let message = app.api.remove_category(link).await?;
                acknowledge(app, message)
            }
        }
    }
}

impl CategoriesArgs {
    pub async fn run(self, app: &App) -> Result<()> {
        match self.command {
            CategoriesCommand::List { search } => {
                app.ctx.require_view(Resource::Category)?;
                let categories = app.api.list_categories().await?;
                let mut matched: Vec<&Category> = filter_items(&categories, &search, |_| true);
                matched.sort_by_key(|c| c.name.to_lowercase());

                if app.json {
                    return print_ok(matched);
                }
                let rows: Vec<Vec<String>> = matched
                    .iter()
                    .map(|c| vec![c.id.to_string(), c.name.clone()])
                    .collect();
                print_table(&["ID", "Name"], &rows);
                Ok(())
            }
            CategoriesCommand::Add { name } => {
                app.ctx.require_edit(Resource::Category)?;
                let message = app.api.add_category(&non_blank("name", name)?).await?;
                acknowledge(app, message)
            }
            CategoriesCommand::Update { id, name } => {
                app.ctx.require_edit(Resource::Category)?;
                let message = app
                    .api
                    .update_category(id, &non_blank("name", name)?)
                    .await?;
                acknowledge(app, message)
            }
            CategoriesCommand::Delete { id } => {
                app.ctx.require_edit(Resource::Category)?;
                let message = app.api.delete_category(id).await?;
                acknowledge(app, message)
            }
        }
    }
}
