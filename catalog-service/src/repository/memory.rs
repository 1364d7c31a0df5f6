//! In-process repository implementation
//!
//! Every collection lives in one [`Tables`] value behind a single
//! `tokio::sync::RwLock`. Each read operation holds one read guard for its
//! whole duration and each write holds one write guard, so counts, windows and
//! aggregates computed within one call always describe the same snapshot.
//!
//! Per-collection behavior (relations, uniqueness, cascades) is supplied by a
//! [`Resource`] implementation; [`MemoryRepository`] turns any resource into a
//! [`Repository`].

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
use super::query::{
    fold_aggregates, AggregateQuery, AggregateSpec, AggregateValue, Collection, FieldValue,
    Predicate, Record, Window,
};
use super::traits::{Aggregator, Repository, RepositoryResult};
use crate::models::{
    Category, CategoryPatch, Id, NewCategory, NewProduct, NewProductImage, NewProfile, NewTag,
    NewUser, Product, ProductDetail, ProductImage, ProductImagePatch, ProductPatch, Profile,
    ProfileDetail, ProfilePatch, Tag, TagPatch, User, UserSummary,
};

/// Rows of one collection, ordered by id
#[derive(Debug)]
pub struct Table<T> {
    rows: BTreeMap<Id, T>,
    last_id: Id,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<T> Table<T> {
    pub fn get(&self, id: Id) -> Option<&T> {
        self.rows.get(&id)
    }

    pub fn contains(&self, id: Id) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    fn next_id(&self) -> Id {
        self.last_id + 1
    }

    fn insert(&mut self, id: Id, row: T) {
        self.last_id = self.last_id.max(id);
        self.rows.insert(id, row);
    }
}

/// Every collection of the catalog
#[derive(Debug, Default)]
pub struct Tables {
    pub categories: Table<Category>,
    pub tags: Table<Tag>,
    pub products: Table<Product>,
    pub images: Table<ProductImage>,
    pub profiles: Table<Profile>,
    pub users: Table<User>,
}

/// Shared handle to the in-process store. Cloning shares the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repository<R: Resource>(&self) -> MemoryRepository<R> {
        MemoryRepository {
            store: self.clone(),
            _resource: PhantomData,
        }
    }

    pub fn categories(&self) -> CategoryRepository {
        self.repository()
    }

    pub fn tags(&self) -> TagRepository {
        self.repository()
    }

    pub fn products(&self) -> ProductRepository {
        self.repository()
    }

    pub fn product_images(&self) -> ProductImageRepository {
        self.repository()
    }

    pub fn profiles(&self) -> ProfileRepository {
        self.repository()
    }

    pub fn users(&self) -> UserRepository {
        self.repository()
    }
}

/// Collection-specific behavior plugged into [`MemoryRepository`].
pub trait Resource: Send + Sync + 'static {
    /// Stored form
    type Row: Clone + Send + Sync + 'static;
    /// Read form returned to callers
    type View: Send + Sync + 'static;
    /// Borrowed form predicates are evaluated against, built without cloning
    type Probe<'a>: Record;
    type Create: Send + 'static;
    type Update: Send + 'static;

    const NAME: &'static str;

    fn table(tables: &Tables) -> &Table<Self::Row>;

    fn table_mut(tables: &mut Tables) -> &mut Table<Self::Row>;

    fn probe<'a>(tables: &'a Tables, row: &'a Self::Row) -> Self::Probe<'a>;

    fn view(tables: &Tables, row: &Self::Row) -> RepositoryResult<Self::View>;

    /// Build a new row, checking uniqueness and references against `tables`
    fn build(
        tables: &Tables,
        id: Id,
        now: DateTime<Utc>,
        data: Self::Create,
    ) -> RepositoryResult<Self::Row>;

    /// Apply a partial update to a copy of the stored row
    fn apply(
        tables: &Tables,
        row: Self::Row,
        now: DateTime<Utc>,
        data: Self::Update,
    ) -> RepositoryResult<Self::Row>;

    /// Runs before the row is removed: refuse, or cascade to related rows
    fn before_delete(_tables: &mut Tables, _id: Id) -> RepositoryResult<()> {
        Ok(())
    }
}

/// [`Repository`] over one [`Resource`] of a [`MemoryStore`]
pub struct MemoryRepository<R> {
    store: MemoryStore,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for MemoryRepository<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> MemoryRepository<R> {
    fn matching<'a>(
        tables: &'a Tables,
        filter: &'a Predicate,
    ) -> impl Iterator<Item = &'a R::Row> + 'a {
        R::table(tables)
            .values()
            .filter(move |row| filter.is_all() || filter.matches(&R::probe(tables, row)))
    }

    /// Row `id`, when it exists and matches `filter`
    fn matching_row<'a>(tables: &'a Tables, id: Id, filter: &Predicate) -> Option<&'a R::Row> {
        R::table(tables)
            .get(id)
            .filter(|row| filter.is_all() || filter.matches(&R::probe(tables, row)))
    }

    fn views<'a>(
        tables: &Tables,
        rows: impl Iterator<Item = &'a R::Row>,
    ) -> RepositoryResult<Vec<R::View>> {
        rows.map(|row| R::view(tables, row)).collect()
    }
}

impl<R: Resource> Repository<Id, R::View, R::Create, R::Update> for MemoryRepository<R> {
    async fn find_by_id(&self, id: &Id) -> RepositoryResult<Option<R::View>> {
        let tables = self.store.tables.read().await;
        R::table(&tables)
            .get(*id)
            .map(|row| R::view(&tables, row))
            .transpose()
    }

    async fn find_first(&self, filter: &Predicate) -> RepositoryResult<Option<R::View>> {
        let tables = self.store.tables.read().await;
        let found = Self::matching(&tables, filter)
            .next()
            .map(|row| R::view(&tables, row))
            .transpose();
        found
    }

    async fn count(&self, filter: &Predicate) -> RepositoryResult<u64> {
        let tables = self.store.tables.read().await;
        Ok(Self::matching(&tables, filter).count() as u64)
    }

    async fn slice(&self, filter: &Predicate, start: u64, end: u64) -> RepositoryResult<Vec<R::View>> {
        let window = Window::range(start, end);
        let tables = self.store.tables.read().await;
        let rows = Self::matching(&tables, filter)
            .skip(usize::try_from(window.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(window.limit).unwrap_or(usize::MAX));
        Self::views(&tables, rows)
    }

    async fn find_page(
        &self,
        filter: &Predicate,
        window: Window,
    ) -> RepositoryResult<(u64, Vec<R::View>)> {
        let tables = self.store.tables.read().await;
        let matched: Vec<&R::Row> = Self::matching(&tables, filter).collect();
        let range = window.clamp(matched.len());
        let records = Self::views(&tables, matched[range].iter().copied())?;
        Ok((matched.len() as u64, records))
    }

    async fn exists(&self, id: &Id) -> RepositoryResult<bool> {
        let tables = self.store.tables.read().await;
        Ok(R::table(&tables).contains(*id))
    }

    async fn create(&self, data: R::Create) -> RepositoryResult<R::View> {
        let mut tables = self.store.tables.write().await;
        let id = R::table(&tables).next_id();
        let row = R::build(&tables, id, Utc::now(), data)?;
        R::table_mut(&mut tables).insert(id, row.clone());
        tracing::debug!(entity = R::NAME, id, "record created");
        R::view(&tables, &row)
    }

    async fn update(&self, id: &Id, data: R::Update) -> RepositoryResult<R::View> {
        self.update_matching(id, &Predicate::all(), data)
            .await?
            .ok_or_else(|| {
                RepositoryError::not_found(R::NAME, id).with_operation(RepositoryOperation::Update)
            })
    }

    async fn delete(&self, id: &Id) -> RepositoryResult<bool> {
        self.delete_matching(id, &Predicate::all()).await
    }

    async fn update_matching(
        &self,
        id: &Id,
        filter: &Predicate,
        data: R::Update,
    ) -> RepositoryResult<Option<R::View>> {
        let mut tables = self.store.tables.write().await;
        let Some(current) = Self::matching_row(&tables, *id, filter).cloned() else {
            return Ok(None);
        };
        let row = R::apply(&tables, current, Utc::now(), data)?;
        R::table_mut(&mut tables).insert(*id, row.clone());
        tracing::debug!(entity = R::NAME, id = *id, "record updated");
        R::view(&tables, &row).map(Some)
    }

    async fn delete_matching(&self, id: &Id, filter: &Predicate) -> RepositoryResult<bool> {
        let mut tables = self.store.tables.write().await;
        if Self::matching_row(&tables, *id, filter).is_none() {
            return Ok(false);
        }
        R::before_delete(&mut tables, *id)?;
        let removed = R::table_mut(&mut tables).rows.remove(id).is_some();
        tracing::debug!(entity = R::NAME, id = *id, "record deleted");
        Ok(removed)
    }
}

impl MemoryStore {
    fn fold_collection(
        tables: &Tables,
        collection: Collection,
        specs: &[&AggregateSpec],
    ) -> RepositoryResult<Vec<AggregateValue>> {
        fn fold<R: Resource>(
            tables: &Tables,
            specs: &[&AggregateSpec],
        ) -> RepositoryResult<Vec<AggregateValue>> {
            let probes = R::table(tables).values().map(|row| R::probe(tables, row));
            fold_aggregates(specs, probes)
        }

        match collection {
            Collection::Categories => fold::<Categories>(tables, specs),
            Collection::Tags => fold::<Tags>(tables, specs),
            Collection::Products => fold::<Products>(tables, specs),
            Collection::ProductImages => fold::<ProductImages>(tables, specs),
            Collection::Profiles => fold::<Profiles>(tables, specs),
            Collection::Users => fold::<Users>(tables, specs),
        }
    }
}

impl Aggregator for MemoryStore {
    async fn aggregate(&self, queries: &[AggregateQuery]) -> RepositoryResult<Vec<AggregateValue>> {
        let tables = self.tables.read().await;
        let mut results: Vec<Option<AggregateValue>> = vec![None; queries.len()];

        let mut collections: Vec<Collection> = Vec::new();
        for query in queries {
            if !collections.contains(&query.collection) {
                collections.push(query.collection);
            }
        }

        // One pass per collection, all of its aggregates at once.
        for collection in collections {
            let positions: Vec<usize> = queries
                .iter()
                .enumerate()
                .filter(|(_, q)| q.collection == collection)
                .map(|(i, _)| i)
                .collect();
            let specs: Vec<&AggregateSpec> = positions.iter().map(|&i| &queries[i].spec).collect();
            let values = Self::fold_collection(&tables, collection, &specs)?;
            for (position, value) in positions.into_iter().zip(values) {
                results[position] = Some(value);
            }
        }

        results
            .into_iter()
            .map(|value| {
                value.ok_or_else(|| {
                    RepositoryError::new(
                        RepositoryOperation::Aggregate,
                        RepositoryErrorKind::Internal,
                        "aggregate produced no value",
                    )
                })
            })
            .collect()
    }
}

fn required<T>(value: Option<T>, operation: RepositoryOperation, field: &str) -> RepositoryResult<T> {
    value.ok_or_else(|| {
        RepositoryError::new(
            operation,
            RepositoryErrorKind::ValidationFailed,
            "This field is required.",
        )
        .with_field(field)
    })
}

fn dangling(entity: &str, id: Id, related: &str) -> RepositoryError {
    RepositoryError::new(
        RepositoryOperation::FindById,
        RepositoryErrorKind::Internal,
        format!("{entity} references a missing {related}"),
    )
    .with_entity(entity, id)
}

/// Fail when another row (other than `exclude`) already has `name`
fn ensure_unique_name<'a, T: 'a>(
    rows: impl Iterator<Item = &'a T>,
    name_of: impl Fn(&T) -> (Id, &str),
    name: &str,
    exclude: Option<Id>,
    operation: RepositoryOperation,
    entity: &str,
) -> RepositoryResult<()> {
    let taken = rows
        .map(name_of)
        .any(|(id, existing)| existing == name && Some(id) != exclude);
    if taken {
        Err(RepositoryError::already_exists(operation, entity, "name"))
    } else {
        Ok(())
    }
}

/// Category collection
pub struct Categories;

impl Resource for Categories {
    type Row = Category;
    type View = Category;
    type Probe<'a> = &'a Category;
    type Create = NewCategory;
    type Update = CategoryPatch;

    const NAME: &'static str = "Category";

    fn table(tables: &Tables) -> &Table<Category> {
        &tables.categories
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Category> {
        &mut tables.categories
    }

    fn probe<'a>(_tables: &'a Tables, row: &'a Category) -> &'a Category {
        row
    }

    fn view(_tables: &Tables, row: &Category) -> RepositoryResult<Category> {
        Ok(row.clone())
    }

    fn build(tables: &Tables, id: Id, now: DateTime<Utc>, data: NewCategory) -> RepositoryResult<Category> {
        let op = RepositoryOperation::Create;
        let visibility = data.visibility();
        let name = required(data.name, op, "name")?;
        ensure_unique_name(
            tables.categories.values(),
            |c| (c.id, c.name.as_str()),
            &name,
            None,
            op,
            Self::NAME,
        )?;
        Ok(Category {
            id,
            name,
            visibility,
            is_active: data.is_active.unwrap_or(true),
            created_on: now,
            updated_on: now,
        })
    }

    fn apply(tables: &Tables, mut row: Category, now: DateTime<Utc>, data: CategoryPatch) -> RepositoryResult<Category> {
        if let Some(visibility) = data.visibility() {
            row.visibility = visibility;
        }
        if let Some(name) = data.name {
            ensure_unique_name(
                tables.categories.values(),
                |c| (c.id, c.name.as_str()),
                &name,
                Some(row.id),
                RepositoryOperation::Update,
                Self::NAME,
            )?;
            row.name = name;
        }
        if let Some(is_active) = data.is_active {
            row.is_active = is_active;
        }
        row.updated_on = now;
        Ok(row)
    }

    fn before_delete(tables: &mut Tables, id: Id) -> RepositoryResult<()> {
        let referenced = tables.products.values().any(|p| p.category_id == id);
        if referenced {
            return Err(RepositoryError::constraint_violation(
                RepositoryOperation::Delete,
                "Cannot delete a category that still has products",
            )
            .with_entity(Self::NAME, id));
        }
        Ok(())
    }
}

/// Tag collection
pub struct Tags;

impl Resource for Tags {
    type Row = Tag;
    type View = Tag;
    type Probe<'a> = &'a Tag;
    type Create = NewTag;
    type Update = TagPatch;

    const NAME: &'static str = "Tag";

    fn table(tables: &Tables) -> &Table<Tag> {
        &tables.tags
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Tag> {
        &mut tables.tags
    }

    fn probe<'a>(_tables: &'a Tables, row: &'a Tag) -> &'a Tag {
        row
    }

    fn view(_tables: &Tables, row: &Tag) -> RepositoryResult<Tag> {
        Ok(row.clone())
    }

    fn build(tables: &Tables, id: Id, now: DateTime<Utc>, data: NewTag) -> RepositoryResult<Tag> {
        let op = RepositoryOperation::Create;
        let name = required(data.name, op, "name")?;
        ensure_unique_name(tables.tags.values(), |t| (t.id, t.name.as_str()), &name, None, op, Self::NAME)?;
        Ok(Tag {
            id,
            name,
            created_on: now,
            updated_on: now,
        })
    }

    fn apply(tables: &Tables, mut row: Tag, now: DateTime<Utc>, data: TagPatch) -> RepositoryResult<Tag> {
        if let Some(name) = data.name {
            ensure_unique_name(
                tables.tags.values(),
                |t| (t.id, t.name.as_str()),
                &name,
                Some(row.id),
                RepositoryOperation::Update,
                Self::NAME,
            )?;
            row.name = name;
        }
        row.updated_on = now;
        Ok(row)
    }

    fn before_delete(tables: &mut Tables, id: Id) -> RepositoryResult<()> {
        for product in tables.products.rows.values_mut() {
            product.tag_ids.retain(|&tag| tag != id);
        }
        Ok(())
    }
}

/// Product joined with its category for predicate evaluation
pub struct ProductProbe<'a> {
    product: &'a Product,
    category: Option<&'a Category>,
}

impl Record for ProductProbe<'_> {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        let product = self.product;
        match name {
            "id" => Some(FieldValue::Integer(product.id)),
            "name" => Some(FieldValue::Text(&product.name)),
            "description" => Some(FieldValue::Text(&product.description)),
            "price" => Some(FieldValue::Integer(product.price)),
            "released_on" => Some(FieldValue::Date(product.released_on)),
            "in_stock" => Some(FieldValue::Boolean(product.in_stock)),
            "category.id" => Some(FieldValue::Integer(product.category_id)),
            _ => name
                .strip_prefix("category.")
                .and_then(|related| self.category?.field(related)),
        }
    }
}

fn check_product_relations(
    tables: &Tables,
    category_id: Option<Id>,
    tag_ids: Option<&[Id]>,
    op: RepositoryOperation,
) -> RepositoryResult<()> {
    if let Some(category_id) = category_id {
        if !tables.categories.contains(category_id) {
            return Err(RepositoryError::missing_reference(op, "category_id", category_id));
        }
    }
    if let Some(missing) = tag_ids
        .unwrap_or_default()
        .iter()
        .find(|&&tag| !tables.tags.contains(tag))
    {
        return Err(RepositoryError::missing_reference(op, "tag_ids", missing));
    }
    Ok(())
}

/// Keep the first occurrence of each tag id
fn dedup_tags(tag_ids: Vec<Id>) -> Vec<Id> {
    let mut seen = Vec::with_capacity(tag_ids.len());
    for id in tag_ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

/// Product collection
pub struct Products;

impl Resource for Products {
    type Row = Product;
    type View = ProductDetail;
    type Probe<'a> = ProductProbe<'a>;
    type Create = NewProduct;
    type Update = ProductPatch;

    const NAME: &'static str = "Product";

    fn table(tables: &Tables) -> &Table<Product> {
        &tables.products
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Product> {
        &mut tables.products
    }

    fn probe<'a>(tables: &'a Tables, row: &'a Product) -> ProductProbe<'a> {
        ProductProbe {
            product: row,
            category: tables.categories.get(row.category_id),
        }
    }

    fn view(tables: &Tables, row: &Product) -> RepositoryResult<ProductDetail> {
        let category = tables
            .categories
            .get(row.category_id)
            .cloned()
            .ok_or_else(|| dangling(Self::NAME, row.id, "category"))?;
        let tags = row
            .tag_ids
            .iter()
            .filter_map(|&tag| tables.tags.get(tag).cloned())
            .collect();
        let images = tables
            .images
            .values()
            .filter(|image| image.product == row.id)
            .cloned()
            .collect();

        Ok(ProductDetail {
            id: row.id,
            name: row.name.clone(),
            description: row.description.clone(),
            price: row.price,
            released_on: row.released_on,
            in_stock: row.in_stock,
            category,
            tags,
            images,
            created_on: row.created_on,
            updated_on: row.updated_on,
        })
    }

    fn build(tables: &Tables, id: Id, now: DateTime<Utc>, data: NewProduct) -> RepositoryResult<Product> {
        let op = RepositoryOperation::Create;
        check_product_relations(tables, data.category_id, data.tag_ids.as_deref(), op)?;
        Ok(Product {
            id,
            name: required(data.name, op, "name")?,
            description: data.description.unwrap_or_default(),
            price: required(data.price, op, "price")?,
            released_on: required(data.released_on, op, "released_on")?,
            in_stock: data.in_stock.unwrap_or(true),
            category_id: required(data.category_id, op, "category_id")?,
            tag_ids: dedup_tags(required(data.tag_ids, op, "tag_ids")?),
            created_on: now,
            updated_on: now,
        })
    }

    fn apply(tables: &Tables, mut row: Product, now: DateTime<Utc>, data: ProductPatch) -> RepositoryResult<Product> {
        check_product_relations(
            tables,
            data.category_id,
            data.tag_ids.as_deref(),
            RepositoryOperation::Update,
        )?;
        if let Some(name) = data.name {
            row.name = name;
        }
        if let Some(description) = data.description {
            row.description = description;
        }
        if let Some(price) = data.price {
            row.price = price;
        }
        if let Some(released_on) = data.released_on {
            row.released_on = released_on;
        }
        if let Some(in_stock) = data.in_stock {
            row.in_stock = in_stock;
        }
        if let Some(category_id) = data.category_id {
            row.category_id = category_id;
        }
        if let Some(tag_ids) = data.tag_ids {
            row.tag_ids = dedup_tags(tag_ids);
        }
        row.updated_on = now;
        Ok(row)
    }

    fn before_delete(tables: &mut Tables, id: Id) -> RepositoryResult<()> {
        tables.images.rows.retain(|_, image| image.product != id);
        Ok(())
    }
}

/// Product image collection
pub struct ProductImages;

impl Resource for ProductImages {
    type Row = ProductImage;
    type View = ProductImage;
    type Probe<'a> = &'a ProductImage;
    type Create = NewProductImage;
    type Update = ProductImagePatch;

    const NAME: &'static str = "ProductImage";

    fn table(tables: &Tables) -> &Table<ProductImage> {
        &tables.images
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<ProductImage> {
        &mut tables.images
    }

    fn probe<'a>(_tables: &'a Tables, row: &'a ProductImage) -> &'a ProductImage {
        row
    }

    fn view(_tables: &Tables, row: &ProductImage) -> RepositoryResult<ProductImage> {
        Ok(row.clone())
    }

    fn build(tables: &Tables, id: Id, now: DateTime<Utc>, data: NewProductImage) -> RepositoryResult<ProductImage> {
        let op = RepositoryOperation::Create;
        let product = required(data.product, op, "product")?;
        if !tables.products.contains(product) {
            return Err(RepositoryError::missing_reference(op, "product", product));
        }
        Ok(ProductImage {
            id,
            product,
            image: required(data.image, op, "image")?,
            caption: data.caption.unwrap_or_default(),
            created_on: now,
            updated_on: now,
        })
    }

    fn apply(
        tables: &Tables,
        mut row: ProductImage,
        now: DateTime<Utc>,
        data: ProductImagePatch,
    ) -> RepositoryResult<ProductImage> {
        if let Some(product) = data.product {
            if !tables.products.contains(product) {
                return Err(RepositoryError::missing_reference(
                    RepositoryOperation::Update,
                    "product",
                    product,
                ));
            }
            row.product = product;
        }
        if let Some(image) = data.image {
            row.image = image;
        }
        if let Some(caption) = data.caption {
            row.caption = caption;
        }
        row.updated_on = now;
        Ok(row)
    }
}

/// Profile joined with its owner for predicate evaluation
pub struct ProfileProbe<'a> {
    profile: &'a Profile,
    user: Option<&'a User>,
}

impl Record for ProfileProbe<'_> {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Integer(self.profile.id)),
            "bio" => Some(FieldValue::Text(&self.profile.bio)),
            "birth_date" => self.profile.birth_date.map(FieldValue::Date),
            "user.id" => Some(FieldValue::Integer(self.profile.user_id)),
            _ => name
                .strip_prefix("user.")
                .and_then(|related| self.user?.field(related)),
        }
    }
}

/// Profile collection
pub struct Profiles;

impl Resource for Profiles {
    type Row = Profile;
    type View = ProfileDetail;
    type Probe<'a> = ProfileProbe<'a>;
    type Create = NewProfile;
    type Update = ProfilePatch;

    const NAME: &'static str = "Profile";

    fn table(tables: &Tables) -> &Table<Profile> {
        &tables.profiles
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Profile> {
        &mut tables.profiles
    }

    fn probe<'a>(tables: &'a Tables, row: &'a Profile) -> ProfileProbe<'a> {
        ProfileProbe {
            profile: row,
            user: tables.users.get(row.user_id),
        }
    }

    fn view(tables: &Tables, row: &Profile) -> RepositoryResult<ProfileDetail> {
        let user = tables
            .users
            .get(row.user_id)
            .map(UserSummary::from)
            .ok_or_else(|| dangling(Self::NAME, row.id, "user"))?;
        Ok(ProfileDetail {
            id: row.id,
            user,
            bio: row.bio.clone(),
            birth_date: row.birth_date,
            resume: row.resume.clone(),
            avatar: row.avatar.clone(),
            created_on: row.created_on,
            updated_on: row.updated_on,
        })
    }

    fn build(tables: &Tables, id: Id, now: DateTime<Utc>, data: NewProfile) -> RepositoryResult<Profile> {
        let op = RepositoryOperation::Create;
        if !tables.users.contains(data.user_id) {
            return Err(RepositoryError::missing_reference(op, "user", data.user_id));
        }
        if tables.profiles.values().any(|p| p.user_id == data.user_id) {
            return Err(RepositoryError::already_exists(op, Self::NAME, "user"));
        }
        Ok(Profile {
            id,
            user_id: data.user_id,
            bio: data.bio,
            birth_date: data.birth_date,
            resume: None,
            avatar: None,
            created_on: now,
            updated_on: now,
        })
    }

    fn apply(_tables: &Tables, mut row: Profile, now: DateTime<Utc>, data: ProfilePatch) -> RepositoryResult<Profile> {
        if let Some(bio) = data.bio {
            row.bio = bio;
        }
        if let Some(birth_date) = data.birth_date {
            row.birth_date = birth_date;
        }
        if let Some(resume) = data.resume {
            row.resume = resume;
        }
        if let Some(avatar) = data.avatar {
            row.avatar = avatar;
        }
        row.updated_on = now;
        Ok(row)
    }
}

/// Account collection. Accounts are only created at startup and never updated over HTTP.
pub struct Users;

impl Resource for Users {
    type Row = User;
    type View = User;
    type Probe<'a> = &'a User;
    type Create = NewUser;
    type Update = std::convert::Infallible;

    const NAME: &'static str = "User";

    fn table(tables: &Tables) -> &Table<User> {
        &tables.users
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<User> {
        &mut tables.users
    }

    fn probe<'a>(_tables: &'a Tables, row: &'a User) -> &'a User {
        row
    }

    fn view(_tables: &Tables, row: &User) -> RepositoryResult<User> {
        Ok(row.clone())
    }

    fn build(tables: &Tables, id: Id, now: DateTime<Utc>, data: NewUser) -> RepositoryResult<User> {
        if tables.users.values().any(|u| u.username == data.username) {
            return Err(RepositoryError::already_exists(
                RepositoryOperation::Create,
                Self::NAME,
                "username",
            ));
        }
        Ok(User {
            id,
            username: data.username,
            email: data.email,
            password_hash: data.password_hash,
            role: data.role,
            is_active: true,
            date_joined: now,
        })
    }

    fn apply(_tables: &Tables, _row: User, _now: DateTime<Utc>, data: std::convert::Infallible) -> RepositoryResult<User> {
        match data {}
    }

    fn before_delete(tables: &mut Tables, id: Id) -> RepositoryResult<()> {
        tables.profiles.rows.retain(|_, profile| profile.user_id != id);
        Ok(())
    }
}

pub type CategoryRepository = MemoryRepository<Categories>;
pub type TagRepository = MemoryRepository<Tags>;
pub type ProductRepository = MemoryRepository<Products>;
pub type ProductImageRepository = MemoryRepository<ProductImages>;
pub type ProfileRepository = MemoryRepository<Profiles>;
pub type UserRepository = MemoryRepository<Users>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::repository::FilterCondition;
    use chrono::NaiveDate;

    fn new_category(name: &str) -> NewCategory {
        NewCategory {
            name: Some(name.to_string()),
            ..NewCategory::default()
        }
    }

    fn new_product(name: &str, price: i64, category_id: Id, tag_ids: Vec<Id>) -> NewProduct {
        NewProduct {
            name: Some(name.to_string()),
            description: None,
            price: Some(price),
            released_on: NaiveDate::from_ymd_opt(2024, 3, 1),
            in_stock: None,
            category_id: Some(category_id),
            tag_ids: Some(tag_ids),
        }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let books = store.categories().create(new_category("Books")).await.unwrap();
        let garden = store.categories().create(new_category("Garden")).await.unwrap();
        for i in 0..25 {
            let category = if i % 2 == 0 { books.id } else { garden.id };
            store
                .products()
                .create(new_product(&format!("item {i}"), i * 10, category, vec![]))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_ids_ascend_from_one() {
        let store = MemoryStore::new();
        let a = store.tags().create(NewTag { name: Some("a".into()) }).await.unwrap();
        let b = store.tags().create(NewTag { name: Some("b".into()) }).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
    }

    #[tokio::test]
    async fn test_find_page_matches_count_and_slice() {
        let store = seeded().await;
        let products = store.products();
        let all = Predicate::all();

        let (total, page) = products.find_page(&all, Window::new(20, 10)).await.unwrap();
        assert_eq!(total, 25);
        assert_eq!(page.len(), 5);
        assert_eq!(page[0].name, "item 20");

        assert_eq!(products.count(&all).await.unwrap(), 25);
        let sliced = products.slice(&all, 20, 30).await.unwrap();
        assert_eq!(sliced, page);

        let (_, beyond) = products.find_page(&all, Window::new(30, 10)).await.unwrap();
        assert!(beyond.is_empty());
    }

    #[tokio::test]
    async fn test_filter_on_related_category() {
        let store = seeded().await;
        let filter = Predicate::from(FilterCondition::icontains("category.name", "GARD"));
        let (total, page) = store.products().find_page(&filter, Window::new(0, 100)).await.unwrap();
        assert_eq!(total, 12);
        assert!(page.iter().all(|p| p.category.name == "Garden"));
    }

    #[tokio::test]
    async fn test_category_name_unique() {
        let store = seeded().await;
        let err = store.categories().create(new_category("Books")).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::AlreadyExists);
        assert_eq!(err.field.as_deref(), Some("name"));

        // Renaming a category to its own name is fine
        let patch = CategoryPatch {
            name: Some("Books".into()),
            ..CategoryPatch::default()
        };
        assert!(store.categories().update(&1, patch).await.is_ok());
    }

    #[tokio::test]
    async fn test_product_requires_existing_relations() {
        let store = seeded().await;
        let err = store
            .products()
            .create(new_product("ghost", 1, 99, vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ValidationFailed);
        assert_eq!(err.field.as_deref(), Some("category_id"));

        let err = store
            .products()
            .create(new_product("ghost", 1, 1, vec![7]))
            .await
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("tag_ids"));
        assert_eq!(store.products().count(&Predicate::all()).await.unwrap(), 25);
    }

    #[tokio::test]
    async fn test_category_delete_is_protected() {
        let store = seeded().await;
        let err = store.categories().delete(&1).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ConstraintViolation);
        assert!(store.categories().exists(&1).await.unwrap());

        let empty = store.categories().create(new_category("Empty")).await.unwrap();
        assert!(store.categories().delete(&empty.id).await.unwrap());
        assert!(!store.categories().delete(&empty.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_product_delete_cascades_images() {
        let store = seeded().await;
        let image = store
            .product_images()
            .create(NewProductImage {
                product: Some(1),
                image: Some("product_images/front.png".into()),
                caption: None,
            })
            .await
            .unwrap();

        let product = store.products().find_by_id(&1).await.unwrap().unwrap();
        assert_eq!(product.images, vec![image.clone()]);

        assert!(store.products().delete(&1).await.unwrap());
        assert!(!store.product_images().exists(&image.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_tag_delete_detaches_from_products() {
        let store = seeded().await;
        let tag = store.tags().create(NewTag { name: Some("sale".into()) }).await.unwrap();
        let patch = ProductPatch {
            tag_ids: Some(vec![tag.id, tag.id]),
            ..ProductPatch::default()
        };
        let product = store.products().update(&2, patch).await.unwrap();
        assert_eq!(product.tags.len(), 1);

        store.tags().delete(&tag.id).await.unwrap();
        let product = store.products().find_by_id(&2).await.unwrap().unwrap();
        assert!(product.tags.is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let store = MemoryStore::new();
        let err = store.tags().update(&5, TagPatch::default()).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.operation, RepositoryOperation::Update);
    }

    #[tokio::test]
    async fn test_filtered_writes_skip_rows_outside_filter() {
        let store = seeded().await;
        let garden = Predicate::from(FilterCondition::icontains("category.name", "garden"));
        let rename = || ProductPatch {
            name: Some("renamed".into()),
            ..ProductPatch::default()
        };

        // Product 1 is in Books
        assert!(store.products().update_matching(&1, &garden, rename()).await.unwrap().is_none());
        assert!(!store.products().delete_matching(&1, &garden).await.unwrap());
        let untouched = store.products().find_by_id(&1).await.unwrap().unwrap();
        assert_eq!(untouched.name, "item 0");

        let updated = store.products().update_matching(&2, &garden, rename()).await.unwrap();
        assert_eq!(updated.map(|p| p.name).as_deref(), Some("renamed"));
        assert!(store.products().delete_matching(&2, &garden).await.unwrap());
        assert!(!store.products().exists(&2).await.unwrap());
    }

    #[tokio::test]
    async fn test_profile_found_by_owner() {
        let store = MemoryStore::new();
        for name in ["ann", "bob"] {
            let user = store
                .users()
                .create(NewUser {
                    username: name.into(),
                    email: format!("{name}@example.com"),
                    password_hash: String::new(),
                    role: Role::Plain,
                })
                .await
                .unwrap();
            store
                .profiles()
                .create(NewProfile {
                    user_id: user.id,
                    ..NewProfile::default()
                })
                .await
                .unwrap();
        }

        let filter = Predicate::from(FilterCondition::eq("user.id", 2i64));
        let profile = store.profiles().find_first(&filter).await.unwrap().unwrap();
        assert_eq!(profile.user.username, "bob");

        let duplicate = store
            .profiles()
            .create(NewProfile {
                user_id: 2,
                ..NewProfile::default()
            })
            .await
            .unwrap_err();
        assert_eq!(duplicate.kind, RepositoryErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_aggregate_across_collections() {
        let store = seeded().await;
        let queries = [
            AggregateQuery::new(Collection::Products, AggregateSpec::Count),
            AggregateQuery::new(Collection::Categories, AggregateSpec::Count),
            AggregateQuery::new(Collection::Products, AggregateSpec::Sum("price")),
            AggregateQuery::new(Collection::Users, AggregateSpec::Count),
        ];
        let values = store.aggregate(&queries).await.unwrap();
        assert_eq!(values[0].as_count(), 25);
        assert_eq!(values[1].as_count(), 2);
        assert_eq!(values[2].as_sum(), (0..25).map(|i| i * 10).sum::<i64>());
        assert_eq!(values[3].as_count(), 0);
    }
}
