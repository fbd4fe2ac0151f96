//! Typed client over a [`Backend`].
//!
//! Every operation takes the [`SessionContext`] explicitly. Operations
//! that need a token fail with `NotAuthenticated` before any request is
//! made, and when the session knows the signed-in user its roles are
//! checked locally first.

use crate::api::{ApiRequest, Backend, MedicineQuery};
use crate::{
    Capability, Error, LoginRequest, LoginResponse, Medicine, PagedResponse, Prescription,
    PrescriptionRequest, Result, RolesResponse, SessionContext, UserDto, UsersResponse,
};
use serde::de::DeserializeOwned;

pub struct MediTrackerClient<B: Backend> {
    backend: B,
}

impl<B: Backend> MediTrackerClient<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn authorize<'s>(&self, session: &'s SessionContext, capability: Capability) -> Result<&'s str> {
        let token = session.require_token()?;
        if session.user().is_some() && !session.can(capability) {
            return Err(Error::Forbidden(format!(
                "your role ({}) cannot {}",
                session.roles(),
                capability
            )));
        }
        Ok(token)
    }

    fn call<T: DeserializeOwned>(
        &self,
        session: &SessionContext,
        capability: Capability,
        request: ApiRequest,
    ) -> Result<T> {
        let token = self.authorize(session, capability)?;
        let body = self.backend.execute(&request, Some(token))?;
        Ok(serde_json::from_value(body)?)
    }

    fn call_unit(
        &self,
        session: &SessionContext,
        capability: Capability,
        request: ApiRequest,
    ) -> Result<()> {
        let token = self.authorize(session, capability)?;
        self.backend.execute(&request, Some(token))?;
        Ok(())
    }

    /// Exchange credentials for a token and store it in the session
    pub fn login(&self, session: &mut SessionContext, credentials: &LoginRequest) -> Result<()> {
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(Error::Validation("Email and password are required".into()));
        }

        let body = self.backend.execute(&ApiRequest::login(credentials)?, None)?;
        let response: LoginResponse = serde_json::from_value(body)?;
        if response.token.trim().is_empty() {
            return Err(Error::Unauthorized("backend returned an empty token".into()));
        }

        session.login(response.token, response.user);
        tracing::info!("Signed in as {}", credentials.email.trim());
        Ok(())
    }

    /// Forget the token. The backend keeps no session state to end.
    pub fn logout(&self, session: &mut SessionContext) {
        session.logout();
        tracing::info!("Signed out");
    }

    pub fn list_medicines(&self, session: &SessionContext) -> Result<Vec<Medicine>> {
        self.call(session, Capability::ViewMedicines, ApiRequest::list_medicines())
    }

    pub fn medicines_paged(
        &self,
        session: &SessionContext,
        query: &MedicineQuery,
    ) -> Result<PagedResponse<Medicine>> {
        self.call(session, Capability::ViewMedicines, ApiRequest::medicines_paged(query))
    }

    pub fn get_medicine(&self, session: &SessionContext, id: i64) -> Result<Medicine> {
        self.call(session, Capability::ViewMedicines, ApiRequest::get_medicine(id))
    }

    pub fn create_medicine(&self, session: &SessionContext, medicine: &Medicine) -> Result<Medicine> {
        if medicine.name.trim().is_empty() {
            return Err(Error::Validation("Medicine name is required".into()));
        }
        self.call(session, Capability::AddMedicine, ApiRequest::create_medicine(medicine)?)
    }

    pub fn update_medicine(
        &self,
        session: &SessionContext,
        id: i64,
        medicine: &Medicine,
    ) -> Result<Medicine> {
        if medicine.name.trim().is_empty() {
            return Err(Error::Validation("Medicine name is required".into()));
        }
        self.call(
            session,
            Capability::ManageMedicines,
            ApiRequest::update_medicine(id, medicine)?,
        )
    }

    pub fn delete_medicine(&self, session: &SessionContext, id: i64) -> Result<()> {
        self.call_unit(session, Capability::ManageMedicines, ApiRequest::delete_medicine(id))
    }

    /// Validate and submit a new prescription for the signed-in patient
    pub fn create_prescription(
        &self,
        session: &SessionContext,
        request: PrescriptionRequest,
    ) -> Result<()> {
        let request = request.normalized()?;
        self.call_unit(
            session,
            Capability::ViewPrescriptions,
            ApiRequest::create_prescription(&request)?,
        )
    }

    pub fn list_my_prescriptions(&self, session: &SessionContext) -> Result<Vec<Prescription>> {
        self.call(
            session,
            Capability::ViewPrescriptions,
            ApiRequest::list_my_prescriptions(),
        )
    }

    pub fn list_users(
        &self,
        session: &SessionContext,
        role: Option<&str>,
        only: bool,
    ) -> Result<Vec<UserDto>> {
        let response: UsersResponse =
            self.call(session, Capability::ManageUsers, ApiRequest::list_users(role, only))?;
        Ok(response.users)
    }

    pub fn list_roles(&self, session: &SessionContext) -> Result<Vec<String>> {
        let response: RolesResponse =
            self.call(session, Capability::ManageUsers, ApiRequest::list_roles())?;
        Ok(response.roles)
    }

    pub fn update_user_roles(
        &self,
        session: &SessionContext,
        user_id: i64,
        roles: &[String],
    ) -> Result<()> {
        if roles.iter().all(|r| r.trim().is_empty()) {
            return Err(Error::Validation("Roles list cannot be empty".into()));
        }
        self.call_unit(
            session,
            Capability::ManageUsers,
            ApiRequest::update_user_roles(user_id, roles)?,
        )
    }

    pub fn delete_user(&self, session: &SessionContext, user_id: i64) -> Result<()> {
        self.call_unit(session, Capability::ManageUsers, ApiRequest::delete_user(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::{DayOfWeek, Dosage, ScheduleEntry};
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Records requests and replays canned responses in order
    #[derive(Default)]
    struct MockBackend {
        responses: RefCell<VecDeque<Result<Value>>>,
        requests: RefCell<Vec<(ApiRequest, Option<String>)>>,
    }

    impl MockBackend {
        fn with_response(self, response: Value) -> Self {
            self.responses.borrow_mut().push_back(Ok(response));
            self
        }

        fn with_error(self, error: Error) -> Self {
            self.responses.borrow_mut().push_back(Err(error));
            self
        }

        fn requests(&self) -> Vec<(ApiRequest, Option<String>)> {
            self.requests.borrow().clone()
        }
    }

    impl Backend for MockBackend {
        fn execute(&self, request: &ApiRequest, token: Option<&str>) -> Result<Value> {
            self.requests
                .borrow_mut()
                .push((request.clone(), token.map(String::from)));
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or(Ok(Value::Null))
        }
    }

    fn user(role: &str) -> UserDto {
        UserDto {
            user_id: 5,
            name: "Sam".into(),
            email: "sam@example.org".into(),
            role: role.into(),
            created_at: String::new(),
            patient_active: false,
            doctor_active: false,
        }
    }

    fn signed_in(role: Option<&str>) -> SessionContext {
        let mut session = SessionContext::new();
        session.login("tok", role.map(user));
        session
    }

    fn credentials() -> LoginRequest {
        LoginRequest {
            email: "sam@example.org".into(),
            password: "pw".into(),
        }
    }

    #[test]
    fn test_login_populates_session() {
        let client = MediTrackerClient::new(
            MockBackend::default().with_response(json!({"token": "jwt-123"})),
        );
        let mut session = SessionContext::new();

        client.login(&mut session, &credentials()).unwrap();
        assert_eq!(session.token(), Some("jwt-123"));
        assert!(session.user().is_none());

        let requests = client.backend().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0.path, "/auth/login");
        assert_eq!(requests[0].1, None);
    }

    #[test]
    fn test_login_failure_leaves_session_signed_out() {
        let client = MediTrackerClient::new(
            MockBackend::default().with_error(Error::Unauthorized("Bad credentials".into())),
        );
        let mut session = SessionContext::new();

        assert!(matches!(
            client.login(&mut session, &credentials()),
            Err(Error::Unauthorized(_))
        ));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_login_requires_credentials() {
        let client = MediTrackerClient::new(MockBackend::default());
        let mut session = SessionContext::new();
        let empty = LoginRequest {
            email: " ".into(),
            password: "pw".into(),
        };
        assert!(matches!(
            client.login(&mut session, &empty),
            Err(Error::Validation(_))
        ));
        assert!(client.backend().requests().is_empty());
    }

    #[test]
    fn test_logout_clears_session() {
        let client = MediTrackerClient::new(MockBackend::default());
        let mut session = signed_in(Some("PATIENT"));
        client.logout(&mut session);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_signed_out_calls_never_reach_backend() {
        let client = MediTrackerClient::new(MockBackend::default());
        let session = SessionContext::new();

        assert!(matches!(
            client.list_my_prescriptions(&session),
            Err(Error::NotAuthenticated)
        ));
        assert!(client.backend().requests().is_empty());
    }

    #[test]
    fn test_token_forwarded_and_prescriptions_decoded() {
        let client = MediTrackerClient::new(MockBackend::default().with_response(json!([{
            "id": 1,
            "medicineId": 2,
            "medicineName": "Lisinopril",
            "dosageAmount": 10,
            "dosageUnit": "MG",
            "startDate": "2024-01-01",
            "endDate": "2024-12-31",
            "timeZone": "UTC",
            "schedule": [{"dayOfWeek": "TUESDAY", "timeOfDay": "20:30"}]
        }])));
        let session = signed_in(Some("PATIENT"));

        let prescriptions = client.list_my_prescriptions(&session).unwrap();
        assert_eq!(prescriptions.len(), 1);
        assert_eq!(prescriptions[0].schedule_lines(), vec!["Tue at 20:30"]);

        let requests = client.backend().requests();
        assert_eq!(requests[0].0.path, "/prescriptions/me");
        assert_eq!(requests[0].1.as_deref(), Some("tok"));
    }

    #[test]
    fn test_known_role_checked_locally() {
        let client = MediTrackerClient::new(MockBackend::default());
        let session = signed_in(Some("PATIENT"));

        assert!(matches!(
            client.list_users(&session, None, false),
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(
            client.delete_medicine(&session, 3),
            Err(Error::Forbidden(_))
        ));
        assert!(client.backend().requests().is_empty());
    }

    #[test]
    fn test_unknown_user_defers_to_backend() {
        let client = MediTrackerClient::new(
            MockBackend::default().with_response(json!({"users": []})),
        );
        let session = signed_in(None);

        let users = client.list_users(&session, Some("ADMIN"), true).unwrap();
        assert!(users.is_empty());
        assert_eq!(client.backend().requests().len(), 1);
    }

    #[test]
    fn test_doctor_can_add_but_not_delete_medicine() {
        let client = MediTrackerClient::new(
            MockBackend::default().with_response(json!({"id": 11, "name": "Amoxicillin"})),
        );
        let session = signed_in(Some("DOCTOR"));

        let created = client
            .create_medicine(
                &session,
                &Medicine {
                    name: "Amoxicillin".into(),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(created.id, Some(11));
        assert!(client.delete_medicine(&session, 11).is_err());
        assert_eq!(client.backend().requests().len(), 1);
    }

    #[test]
    fn test_admin_updates_medicine_with_put() {
        let client = MediTrackerClient::new(MockBackend::default().with_response(json!({
            "id": 4,
            "name": "Ibuprofen",
            "strength": "400mg"
        })));
        let session = signed_in(Some("ADMIN"));
        let medicine = Medicine {
            id: Some(4),
            name: "Ibuprofen".into(),
            strength: Some("400mg".into()),
            ..Default::default()
        };

        let updated = client.update_medicine(&session, 4, &medicine).unwrap();
        assert_eq!(updated.strength.as_deref(), Some("400mg"));

        let requests = client.backend().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0.method, Method::Put);
        assert_eq!(requests[0].0.path, "/medicine/4");
        assert_eq!(
            requests[0].0.body,
            Some(json!({"id": 4, "name": "Ibuprofen", "strength": "400mg"}))
        );
        assert_eq!(requests[0].1.as_deref(), Some("tok"));
    }

    #[test]
    fn test_doctor_cannot_update_medicine() {
        let client = MediTrackerClient::new(MockBackend::default());
        let session = signed_in(Some("DOCTOR"));
        let medicine = Medicine {
            name: "Ibuprofen".into(),
            ..Default::default()
        };

        assert!(matches!(
            client.update_medicine(&session, 4, &medicine),
            Err(Error::Forbidden(_))
        ));

        let blank = Medicine::default();
        assert!(matches!(
            client.update_medicine(&signed_in(Some("ADMIN")), 4, &blank),
            Err(Error::Validation(_))
        ));
        assert!(client.backend().requests().is_empty());
    }

    #[test]
    fn test_paged_medicines() {
        let client = MediTrackerClient::new(MockBackend::default().with_response(json!({
            "content": [{"id": 1, "name": "Aspirin", "strength": "100mg"}],
            "page": 0,
            "size": 20,
            "totalElements": 1,
            "totalPages": 1
        })));
        let session = signed_in(Some("USER"));

        let query = MedicineQuery::new(0, 20, Some("asp")).unwrap();
        let page = client.medicines_paged(&session, &query).unwrap();
        assert_eq!(page.content[0].strength.as_deref(), Some("100mg"));
        assert!(!page.has_next());
        assert_eq!(client.backend().requests()[0].0.query.len(), 3);
    }

    #[test]
    fn test_invalid_prescription_not_sent() {
        let client = MediTrackerClient::new(MockBackend::default());
        let session = signed_in(Some("PATIENT"));
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let request = PrescriptionRequest {
            medicine_id: 4,
            dosage: Dosage {
                amount: 1.0,
                unit: "TABLET".into(),
            },
            start_date: start,
            end_date: NaiveDate::from_ymd_opt(2024, 4, 1),
            time_zone: "UTC".into(),
            schedule: vec![ScheduleEntry::new(DayOfWeek::Monday, "08:00")],
        };

        assert!(matches!(
            client.create_prescription(&session, request.clone()),
            Err(Error::Validation(_))
        ));
        assert!(client.backend().requests().is_empty());

        let valid = PrescriptionRequest {
            end_date: None,
            ..request
        };
        client.create_prescription(&session, valid).unwrap();
        let requests = client.backend().requests();
        assert_eq!(requests[0].0.method, Method::Post);
        assert_eq!(requests[0].0.path, "/prescriptions");
    }

    #[test]
    fn test_update_roles_requires_non_empty_list() {
        let client = MediTrackerClient::new(MockBackend::default());
        let session = signed_in(Some("ADMIN"));

        assert!(matches!(
            client.update_user_roles(&session, 3, &[]),
            Err(Error::Validation(_))
        ));
        client
            .update_user_roles(&session, 3, &["DOCTOR".to_string()])
            .unwrap();
        assert_eq!(client.backend().requests().len(), 1);
    }

    #[test]
    fn test_backend_errors_propagate() {
        let client = MediTrackerClient::new(MockBackend::default().with_error(Error::Api {
            status: 404,
            message: "Medicine not found".into(),
        }));
        let session = signed_in(None);

        match client.get_medicine(&session, 99) {
            Err(Error::Api { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "Medicine not found");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
