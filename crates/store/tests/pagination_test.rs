//! Paged reads through the repository.

mod support;

use sea_orm::{ColumnTrait, Condition};

use gateway_store_lib::{OrderBy, PageRequest, UnitOfWorkFactory};

use support::{ids, seed_widgets, test_factory, widget};

async fn factory_with(count: i32) -> UnitOfWorkFactory {
    let factory = test_factory().await;
    let widgets = (1..=count)
        .map(|id| support::widget(id, &format!("w{id:02}")))
        .collect();
    seed_widgets(&factory, widgets).await;
    factory
}

#[tokio::test]
async fn test_third_page_of_twenty_five() {
    let factory = factory_with(25).await;
    let uow = factory.create().await.unwrap();
    let widgets = uow.repository::<widget::Entity>().unwrap();

    let page = widgets
        .get_paged(
            &PageRequest::new(3, 10),
            Condition::all(),
            Some(OrderBy::ascending(widget::Column::Id)),
        )
        .await
        .unwrap();

    assert_eq!(ids(&page.items, |w| w.id), (21..=25).collect::<Vec<_>>());
    assert_eq!(page.page_number, 3);
    assert_eq!(page.page_size, 10);
    assert_eq!(page.total_count, 25);
    assert_eq!(page.total_pages(), 3);
    assert!(!page.has_next_page());
}

#[tokio::test]
async fn test_first_page_of_twenty_five() {
    let factory = factory_with(25).await;
    let uow = factory.create().await.unwrap();
    let widgets = uow.repository::<widget::Entity>().unwrap();

    let page = widgets
        .get_paged(
            &PageRequest::new(1, 10),
            Condition::all(),
            Some(OrderBy::ascending(widget::Column::Id)),
        )
        .await
        .unwrap();

    assert_eq!(ids(&page.items, |w| w.id), (1..=10).collect::<Vec<_>>());
    assert!(page.has_next_page());
}

#[tokio::test]
async fn test_page_past_the_end_falls_back_to_first_page() {
    let factory = factory_with(25).await;
    let uow = factory.create().await.unwrap();
    let widgets = uow.repository::<widget::Entity>().unwrap();

    let page = widgets
        .get_paged(
            &PageRequest::new(4, 10),
            Condition::all(),
            Some(OrderBy::ascending(widget::Column::Id)),
        )
        .await
        .unwrap();

    assert_eq!(page.page_number, 1);
    assert_eq!(ids(&page.items, |w| w.id), (1..=10).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_page_zero_and_size_zero_use_defaults() {
    let factory = factory_with(25).await;
    let uow = factory.create().await.unwrap();
    let widgets = uow.repository::<widget::Entity>().unwrap();

    let page = widgets
        .get_paged(
            &PageRequest::new(0, 0),
            Condition::all(),
            Some(OrderBy::ascending(widget::Column::Id)),
        )
        .await
        .unwrap();

    assert_eq!(page.page_number, 1);
    assert_eq!(page.page_size, 10);
    assert_eq!(page.items.len(), 10);
}

#[tokio::test]
async fn test_order_defaults_to_descending() {
    let factory = factory_with(25).await;
    let uow = factory.create().await.unwrap();
    let widgets = uow.repository::<widget::Entity>().unwrap();

    let page = widgets
        .get_paged(
            &PageRequest::default(),
            Condition::all(),
            Some(OrderBy::new(widget::Column::Id)),
        )
        .await
        .unwrap();

    assert_eq!(
        ids(&page.items, |w| w.id),
        (16..=25).rev().collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_filter_applies_before_counting() {
    let factory = factory_with(25).await;
    let uow = factory.create().await.unwrap();
    let widgets = uow.repository::<widget::Entity>().unwrap();

    let page = widgets
        .get_paged(
            &PageRequest::new(2, 5),
            widget::Column::Id.gt(18),
            Some(OrderBy::ascending(widget::Column::Name)),
        )
        .await
        .unwrap();

    assert_eq!(page.total_count, 7);
    assert_eq!(page.total_pages(), 2);
    assert_eq!(ids(&page.items, |w| w.id), vec![24, 25]);
}

#[tokio::test]
async fn test_empty_result() {
    let factory = factory_with(0).await;
    let uow = factory.create().await.unwrap();
    let widgets = uow.repository::<widget::Entity>().unwrap();

    let page = widgets
        .get_paged(&PageRequest::new(2, 10), Condition::all(), None)
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.page_number, 1);
    assert_eq!(page.total_count, 0);
    assert_eq!(page.total_pages(), 0);
}

#[tokio::test]
async fn test_pages_over_duplicate_values_never_overlap() {
    let factory = test_factory().await;
    let names = ["b", "a", "c"];
    let widgets = (1..=25)
        .map(|id| support::widget(id, names[(id % 3) as usize]))
        .collect();
    seed_widgets(&factory, widgets).await;

    let uow = factory.create().await.unwrap();
    let widgets = uow.repository::<widget::Entity>().unwrap();

    let mut seen = Vec::new();
    for page_number in 1..=7 {
        let page = widgets
            .get_paged(
                &PageRequest::new(page_number, 4),
                Condition::all(),
                Some(OrderBy::ascending(widget::Column::Name)),
            )
            .await
            .unwrap();
        assert_eq!(page.page_number, page_number);
        seen.extend(page.items);
    }

    // Ties on name fall back to key order
    let mut expected: Vec<_> = (1..=25).map(|id| (names[(id % 3) as usize], id)).collect();
    expected.sort();
    let expected: Vec<i32> = expected.into_iter().map(|(_, id)| id).collect();

    assert_eq!(ids(&seen, |w| w.id), expected);
}

#[tokio::test]
async fn test_without_order_column_pages_follow_key_order() {
    let factory = factory_with(25).await;
    let uow = factory.create().await.unwrap();
    let widgets = uow.repository::<widget::Entity>().unwrap();

    let page = widgets
        .get_paged(&PageRequest::new(2, 10), Condition::all(), None)
        .await
        .unwrap();

    assert_eq!(ids(&page.items, |w| w.id), (11..=20).collect::<Vec<_>>());
}
