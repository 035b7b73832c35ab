//! [`Command`] for signing a new [`Contract`] from an accepted [`Offer`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        billing::{payment_source, PaymentSource},
        contract, job_request, offer, user, Contract, JobRequest, Offer, User,
    },
    infra::{database, Database},
    read::Active,
    Service,
};

use super::Command;

/// [`Command`] for signing a new [`Contract`] from an accepted [`Offer`].
///
/// Active [`Offer`]s of the same contractor overlapping with the signed
/// [`Contract`] are declined if they don't fit into the weekly hours limit
/// together.
#[derive(Clone, Copy, Debug)]
pub struct CreateContract {
    /// ID of the [`Offer`] to sign a [`Contract`] from.
    pub offer_id: offer::Id,

    /// ID of the [`User`] signing the [`Contract`] on the customer side.
    pub initiator_id: user::Id,

    /// ID of the [`PaymentSource`] the [`Contract`] is paid from.
    pub payment_source_id: Option<payment_source::Id>,
}

impl<Db, Fb> Command<CreateContract> for Service<Db, Fb>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<User, user::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Offer>, offer::Id>>,
            Ok = Option<Offer>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Active<Offer>>, user::Id>>,
            Ok = Vec<Active<Offer>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<JobRequest>, job_request::Id>>,
            Ok = Option<JobRequest>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<PaymentSource>, payment_source::Id>>,
            Ok = Option<PaymentSource>,
            Err = Traced<database::Error>,
        > + Database<Insert<Offer>, Err = Traced<database::Error>>
        + Database<Insert<Contract>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Contract;
    type Err = Traced<ExecutionError>;

    #[expect(clippy::too_many_lines, reason = "sequential checks")]
    async fn execute(
        &self,
        cmd: CreateContract,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateContract {
            offer_id,
            initiator_id,
            payment_source_id,
        } = cmd;

        let initiator = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(initiator_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(User::is_active)
            .ok_or(E::UserNotExists(initiator_id))
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent signings by the same `User`.
        tx.execute(Lock(By::<User, _>::new(initiator_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut offer = tx
            .execute(Select(By::<Option<Offer>, _>::new(offer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OfferNotExists(offer_id))
            .map_err(tracerr::wrap!())?;
        if !offer.is_active() {
            return Err(tracerr::new!(E::OfferInactive(offer_id)));
        }

        let job_request = tx
            .execute(Select(By::<Option<JobRequest>, _>::new(
                offer.job_request_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::JobRequestNotExists(offer.job_request_id))
            .map_err(tracerr::wrap!())?;
        let contractor = tx
            .execute(Select(By::<Option<User>, _>::new(offer.contractor_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(offer.contractor_id))
            .map_err(tracerr::wrap!())?;

        let customer_id = job_request.company_id;
        let supplier_id = contractor.company_id;
        let is_cross_company = supplier_id != Some(customer_id);
        let is_supplier =
            supplier_id.is_some_and(|id| initiator.is_employer_of(id));

        let supplier_approved =
            supplier_id.is_none() || offer.supplier_accepted || is_supplier;
        if !offer.contractor_accepted || !supplier_approved {
            return Err(tracerr::new!(E::OfferNotApproved(offer_id)));
        }
        if job_request.is_internal && is_cross_company {
            return Err(tracerr::new!(E::JobRequestInternal(job_request.id)));
        }
        if !job_request.is_active {
            return Err(tracerr::new!(E::JobRequestInactive(job_request.id)));
        }

        if is_cross_company && payment_source_id.is_none() {
            return Err(tracerr::new!(E::PaymentSourceRequired));
        }
        if let Some(id) = payment_source_id {
            _ = tx
                .execute(Select(By::<Option<PaymentSource>, _>::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .filter(|s| Some(s.company_id) == initiator.company_id)
                .ok_or(E::PaymentSourceNotExists(id))
                .map_err(tracerr::wrap!())?;
        }

        if !initiator.is_employer_of(customer_id) {
            return Err(tracerr::new!(E::NotOfferCustomer(initiator_id)));
        }

        offer.customer_accepted = true;
        if is_supplier {
            offer.supplier_accepted = true;
        }
        _ = offer.close();
        tx.execute(Insert(offer.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let contract =
            Contract::sign(&offer, customer_id, supplier_id, payment_source_id);
        tx.execute(Insert(contract.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let max_hours = i16::from(self.config().max_hours_per_week);
        let mut declined = vec![];
        let active = tx
            .execute(Select(By::<Vec<Active<Offer>>, _>::new(
                offer.contractor_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        for Active(mut other) in active {
            let fits = i16::from(contract.hours_per_week)
                + i16::from(other.hours_per_week)
                <= max_hours;
            let (start, end) = (contract.date_started, contract.date_finished);
            if other.id == offer.id || fits || !other.overlaps(start, end) {
                continue;
            }
            if other.close() {
                tx.execute(Insert(other.clone()))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
                declined.push(other);
            }
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Contract(id: {})` signed from `Offer(id: {offer_id})`, \
             {} overlapping `Offer`s declined",
            contract.id,
            declined.len(),
        );
        self.publish(contract::Event::Signed(contract.clone()));
        for o in declined {
            self.publish(contract::Event::OfferDeclined(o));
        }

        Ok(contract)
    }
}

/// Error of [`CreateContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`JobRequest`] is closed.
    #[display("`JobRequest(id: {_0})` is inactive")]
    JobRequestInactive(#[error(not(source))] job_request::Id),

    /// [`JobRequest`] is internal, while the contractor works for another
    /// company.
    #[display("`JobRequest(id: {_0})` is internal")]
    JobRequestInternal(#[error(not(source))] job_request::Id),

    /// [`JobRequest`] with the provided ID does not exist.
    #[display("`JobRequest(id: {_0})` does not exist")]
    JobRequestNotExists(#[error(not(source))] job_request::Id),

    /// [`User`] is not an employer of the [`Offer`] customer.
    #[display("`User(id: {_0})` is not the `Offer` customer")]
    NotOfferCustomer(#[error(not(source))] user::Id),

    /// [`Offer`] is closed.
    #[display("`Offer(id: {_0})` is inactive")]
    OfferInactive(#[error(not(source))] offer::Id),

    /// [`Offer`] is not accepted by the contractor or the supplier.
    #[display("`Offer(id: {_0})` is not approved")]
    OfferNotApproved(#[error(not(source))] offer::Id),

    /// [`Offer`] with the provided ID does not exist.
    #[display("`Offer(id: {_0})` does not exist")]
    OfferNotExists(#[error(not(source))] offer::Id),

    /// [`PaymentSource`] with the provided ID does not exist or belongs to
    /// another company.
    #[display("`PaymentSource(id: {_0})` does not exist")]
    PaymentSourceNotExists(#[error(not(source))] payment_source::Id),

    /// [`PaymentSource`] is required for a [`Contract`] between different
    /// companies.
    #[display("`PaymentSource` is required")]
    PaymentSourceRequired,

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{
            billing::{payment_source, PaymentSource},
            company,
            contract::Hours,
            job_request, offer, user, Company, JobRequest, Offer, User,
        },
        infra::{database::Memory, facebook},
        Command as _, Config, Service,
    };

    use super::{CreateContract, ExecutionError as E};

    fn user(role: user::Role, company_id: company::Id) -> User {
        let id = user::Id::new();
        User {
            id,
            name: user::Name::new("Test User").unwrap(),
            email: user::Email::new(format!("{id}@example.com")).unwrap(),
            password_hash: None,
            facebook_id: None,
            role,
            company_id: Some(company_id),
            payout_account: None,
            created_at: user::CreationDateTime::now(),
            deleted_at: None,
        }
    }

    fn offer(
        job_request_id: job_request::Id,
        contractor_id: user::Id,
        start: &str,
        weeks: i16,
        hours: i16,
    ) -> Offer {
        Offer {
            job_request_id,
            contractor_id,
            contractor_accepted: true,
            ..offer::spec::offer(start, weeks, hours)
        }
    }

    fn company(name: &str) -> Company {
        Company {
            id: company::Id::new(),
            name: company::Name::new(name).unwrap(),
            payout_account: None,
            created_at: company::CreationDateTime::now(),
        }
    }

    #[tokio::test]
    async fn declines_overbooking_offers_of_contractor() {
        let db = Memory::default();
        let (service, _bg) = Service::new(
            Config::default(),
            db.clone(),
            facebook::Stub::default(),
        );

        let company = company("Acme");
        let employer = user(user::Role::Employer, company.id);
        let worker = user(user::Role::Employee, company.id);
        let job = JobRequest {
            id: job_request::Id::new(),
            company_id: company.id,
            name: job_request::Name::new("Backend").unwrap(),
            hours_per_week: Hours::FULL_TIME,
            is_internal: true,
            is_active: true,
            created_at: job_request::CreationDateTime::now(),
        };

        let signed = offer(job.id, worker.id, "2030-01-01", 4, 30);
        let overbooking = offer(job.id, worker.id, "2030-01-15", 2, 20);
        let fitting = offer(job.id, worker.id, "2030-01-08", 1, 10);
        let later = offer(job.id, worker.id, "2030-03-01", 2, 40);
        {
            let mut state = db.state();
            _ = state.companies.insert(company.id, company.clone());
            for u in [&employer, &worker] {
                _ = state.users.insert(u.id, u.clone());
            }
            _ = state.job_requests.insert(job.id, job.clone());
            for o in [&signed, &overbooking, &fitting, &later] {
                _ = state.offers.insert(o.id, o.clone());
            }
        }

        let err = service
            .execute(CreateContract {
                offer_id: signed.id,
                initiator_id: worker.id,
                payment_source_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::NotOfferCustomer(_)), "{err}");

        let contract = service
            .execute(CreateContract {
                offer_id: signed.id,
                initiator_id: employer.id,
                payment_source_id: None,
            })
            .await
            .unwrap();
        assert!(contract.is_internal());
        assert_eq!(contract.employee_id, worker.id);
        assert_eq!(i16::from(contract.hours_per_week), 30);

        let state = db.state();
        assert!(state.contracts.contains_key(&contract.id));
        let accepted = &state.offers[&signed.id];
        assert!(!accepted.is_active());
        assert!(accepted.customer_accepted);
        assert!(!state.offers[&overbooking.id].is_active());
        assert!(state.offers[&fitting.id].is_active());
        assert!(state.offers[&later.id].is_active());
        drop(state);

        let err = service
            .execute(CreateContract {
                offer_id: signed.id,
                initiator_id: employer.id,
                payment_source_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::OfferInactive(_)), "{err}");
    }

    #[tokio::test]
    async fn checks_cross_company_offer() {
        let db = Memory::default();
        let (service, _bg) = Service::new(
            Config::default(),
            db.clone(),
            facebook::Stub::default(),
        );

        let (customer, supplier) = (company("Acme"), company("Staffing"));
        let employer = user(user::Role::Employer, customer.id);
        let manager = user(user::Role::Employer, supplier.id);
        let worker = user(user::Role::Employee, supplier.id);
        let job = JobRequest {
            id: job_request::Id::new(),
            company_id: customer.id,
            name: job_request::Name::new("Backend").unwrap(),
            hours_per_week: Hours::FULL_TIME,
            is_internal: false,
            is_active: true,
            created_at: job_request::CreationDateTime::now(),
        };
        let source = |company_id| PaymentSource {
            id: payment_source::Id::new(),
            company_id,
            name: payment_source::Name::new("Card").unwrap(),
            created_at: payment_source::CreationDateTime::now(),
        };
        let (customer_card, supplier_card) =
            (source(customer.id), source(supplier.id));

        let unapproved = offer(job.id, worker.id, "2030-01-01", 4, 20);
        let approved = Offer {
            supplier_accepted: true,
            ..offer(job.id, worker.id, "2030-01-01", 4, 20)
        };
        {
            let mut state = db.state();
            for c in [&customer, &supplier] {
                _ = state.companies.insert(c.id, c.clone());
            }
            for u in [&employer, &manager, &worker] {
                _ = state.users.insert(u.id, u.clone());
            }
            for s in [&customer_card, &supplier_card] {
                _ = state.payment_sources.insert(s.id, s.clone());
            }
            _ = state.job_requests.insert(job.id, job.clone());
            for o in [&unapproved, &approved] {
                _ = state.offers.insert(o.id, o.clone());
            }
        }

        let err = service
            .execute(CreateContract {
                offer_id: unapproved.id,
                initiator_id: employer.id,
                payment_source_id: Some(customer_card.id),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::OfferNotApproved(_)), "{err}");

        let err = service
            .execute(CreateContract {
                offer_id: approved.id,
                initiator_id: employer.id,
                payment_source_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::PaymentSourceRequired), "{err}");

        let err = service
            .execute(CreateContract {
                offer_id: approved.id,
                initiator_id: employer.id,
                payment_source_id: Some(supplier_card.id),
            })
            .await
            .unwrap_err();
        assert!(
            matches!(err.as_ref(), E::PaymentSourceNotExists(_)),
            "{err}",
        );

        let err = service
            .execute(CreateContract {
                offer_id: approved.id,
                initiator_id: manager.id,
                payment_source_id: Some(supplier_card.id),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::NotOfferCustomer(_)), "{err}");

        let contract = service
            .execute(CreateContract {
                offer_id: approved.id,
                initiator_id: employer.id,
                payment_source_id: Some(customer_card.id),
            })
            .await
            .unwrap();
        assert!(!contract.is_internal());
        assert_eq!(contract.customer_id, customer.id);
        assert_eq!(contract.supplier_id, Some(supplier.id));
        assert_eq!(contract.payment_source_id, Some(customer_card.id));
        assert!(db.state().offers[&unapproved.id].is_active());
    }
}
