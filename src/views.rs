//! Relationship views that stay current as their source stores change.
//!
//! A [`DerivedView`] owns a small task that waits on the source stores' change feeds
//! and recomputes its value with one of the pure functions in [`crate::relations`].
//! Dropping the view aborts the task.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::identity::RecordId;
use crate::model::{Company, Contact, EntityKind, Fee, Project};
use crate::relations;
use crate::store::{Snapshot, Stores};

pub struct DerivedView<T> {
    rx: watch::Receiver<Arc<T>>,
    task: JoinHandle<()>,
}

impl<T: Send + Sync + 'static> DerivedView<T> {
    /// View over a single store. Must be called inside a Tokio runtime.
    pub fn from_one<A, F>(mut source: watch::Receiver<Snapshot<A>>, compute: F) -> Self
    where
        A: Send + Sync + 'static,
        F: Fn(&[A]) -> T + Send + 'static,
    {
        let current = source.borrow_and_update().clone();
        let (tx, rx) = watch::channel(Arc::new(compute(&current)));
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = source.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tx.closed() => break,
                }
                let current = source.borrow_and_update().clone();
                tx.send_replace(Arc::new(compute(&current)));
            }
        });
        Self { rx, task }
    }

    /// View over two stores; recomputed when either publishes.
    pub fn from_two<A, B, F>(
        mut first: watch::Receiver<Snapshot<A>>,
        mut second: watch::Receiver<Snapshot<B>>,
        compute: F,
    ) -> Self
    where
        A: Send + Sync + 'static,
        B: Send + Sync + 'static,
        F: Fn(&[A], &[B]) -> T + Send + 'static,
    {
        let a = first.borrow_and_update().clone();
        let b = second.borrow_and_update().clone();
        let (tx, rx) = watch::channel(Arc::new(compute(&a, &b)));
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = first.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    changed = second.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tx.closed() => break,
                }
                let a = first.borrow_and_update().clone();
                let b = second.borrow_and_update().clone();
                tx.send_replace(Arc::new(compute(&a, &b)));
            }
        });
        Self { rx, task }
    }

    pub fn current(&self) -> Arc<T> {
        self.rx.borrow().clone()
    }

    /// Waits for the next recomputation and returns it.
    pub async fn changed(&mut self) -> Option<Arc<T>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

impl<T> Drop for DerivedView<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl Stores {
    pub fn contacts_of_company(&self, company_id: RecordId) -> DerivedView<Vec<Contact>> {
        DerivedView::from_one(self.contacts.subscribe(), move |contacts| {
            relations::contacts_of_company(&company_id, contacts)
        })
    }

    pub fn fees_of_company(&self, company_id: RecordId) -> DerivedView<Vec<Fee>> {
        DerivedView::from_one(self.fees.subscribe(), move |fees| {
            relations::fees_of_company(&company_id, fees)
        })
    }

    pub fn fees_of_contact(&self, contact_id: RecordId) -> DerivedView<Vec<Fee>> {
        DerivedView::from_one(self.fees.subscribe(), move |fees| {
            relations::fees_of_contact(&contact_id, fees)
        })
    }

    pub fn fees_of_project(&self, project_id: RecordId) -> DerivedView<Vec<Fee>> {
        DerivedView::from_one(self.fees.subscribe(), move |fees| {
            relations::fees_of_project(&project_id, fees)
        })
    }

    pub fn projects_of_company(&self, company_id: RecordId) -> DerivedView<Vec<Project>> {
        DerivedView::from_two(
            self.fees.subscribe(),
            self.projects.subscribe(),
            move |fees, projects| relations::projects_of_company(&company_id, fees, projects),
        )
    }

    /// Company of a contact; follows both the contact record and the company list.
    pub fn company_of_contact(&self, contact_id: RecordId) -> DerivedView<Option<Company>> {
        DerivedView::from_two(
            self.contacts.subscribe(),
            self.companies.subscribe(),
            move |contacts, companies| {
                relations::parent_of(&contact_id, contacts, &EntityKind::Contact.prefix())
                    .and_then(|contact| relations::company_of_contact(&contact, companies))
            },
        )
    }
}
