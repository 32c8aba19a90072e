//! Pure association functions over cached collections.
//!
//! Foreign keys arrive in several shapes and may or may not carry their table
//! prefix, so every comparison goes through [`equals_ignoring_prefix`]. A reference
//! that resolves to nothing is an empty result, never an error.

use std::cmp::Ordering;

use crate::identity::{equals_ignoring_prefix, RecordId};
use crate::model::{Company, Contact, Entity, EntityKind, Fee, Project};

/// Targets whose foreign key points at `source`.
pub fn related_to<T, F>(source: &RecordId, targets: &[T], fk: F, prefix: &str) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> &RecordId,
{
    targets
        .iter()
        .filter(|target| equals_ignoring_prefix(fk(*target), source, prefix))
        .cloned()
        .collect()
}

/// The parent a foreign-key value points at, first match in collection order.
pub fn parent_of<P: Entity>(fk_value: &RecordId, parents: &[P], prefix: &str) -> Option<P> {
    parents
        .iter()
        .find(|parent| equals_ignoring_prefix(parent.id(), fk_value, prefix))
        .cloned()
}

fn compare_issue_dates(a: &Fee, b: &Fee) -> Ordering {
    // None < Some, so reversing puts unparseable dates last.
    b.issued_at().cmp(&a.issued_at())
}

/// Newest issue date first. Stable, so equal dates keep collection order.
pub fn sort_fees_by_issue_date(fees: &mut [Fee]) {
    fees.sort_by(compare_issue_dates);
}

pub fn contacts_of_company(company_id: &RecordId, contacts: &[Contact]) -> Vec<Contact> {
    related_to(
        company_id,
        contacts,
        |contact| &contact.company,
        &EntityKind::Company.prefix(),
    )
}

pub fn fees_of_company(company_id: &RecordId, fees: &[Fee]) -> Vec<Fee> {
    let mut related = related_to(
        company_id,
        fees,
        |fee| &fee.company_id,
        &EntityKind::Company.prefix(),
    );
    sort_fees_by_issue_date(&mut related);
    related
}

pub fn fees_of_contact(contact_id: &RecordId, fees: &[Fee]) -> Vec<Fee> {
    let mut related = related_to(
        contact_id,
        fees,
        |fee| &fee.contact_id,
        &EntityKind::Contact.prefix(),
    );
    sort_fees_by_issue_date(&mut related);
    related
}

pub fn fees_of_project(project_id: &RecordId, fees: &[Fee]) -> Vec<Fee> {
    let mut related = related_to(
        project_id,
        fees,
        |fee| &fee.project_id,
        &EntityKind::Project.prefix(),
    );
    sort_fees_by_issue_date(&mut related);
    related
}

/// Projects a company is involved in, reached through the company's fees.
/// Collection order of `projects` is kept; each project appears once.
pub fn projects_of_company(
    company_id: &RecordId,
    fees: &[Fee],
    projects: &[Project],
) -> Vec<Project> {
    let company_fees = related_to(
        company_id,
        fees,
        |fee| &fee.company_id,
        &EntityKind::Company.prefix(),
    );
    let prefix = EntityKind::Project.prefix();
    projects
        .iter()
        .filter(|project| {
            company_fees
                .iter()
                .any(|fee| equals_ignoring_prefix(&fee.project_id, &project.id, &prefix))
        })
        .cloned()
        .collect()
}

pub fn company_of_contact(contact: &Contact, companies: &[Company]) -> Option<Company> {
    parent_of(&contact.company, companies, &EntityKind::Company.prefix())
}

pub fn company_of_fee(fee: &Fee, companies: &[Company]) -> Option<Company> {
    parent_of(&fee.company_id, companies, &EntityKind::Company.prefix())
}

pub fn contact_of_fee(fee: &Fee, contacts: &[Contact]) -> Option<Contact> {
    parent_of(&fee.contact_id, contacts, &EntityKind::Contact.prefix())
}

pub fn project_of_fee(fee: &Fee, projects: &[Project]) -> Option<Project> {
    parent_of(&fee.project_id, projects, &EntityKind::Project.prefix())
}
