//! In-memory store ports and request helpers shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use http_body_util::BodyExt;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;
use vor_api::domain::*;
use vor_api::storage::{image_object_key, put_then_commit, ObjectStorage, StorageError};
use vor_api::store::{nest_curriculum, CurriculumStore, HealthCheck, SessionStore, StoreError, StudentStore};
use vor_api::{app, AppState, ImgProxy};

pub const SESSION_TOKEN: &str = "staff-token";
pub const OUTSIDER_TOKEN: &str = "outsider-token";

/// Object storage that keeps uploads in memory.
#[derive(Default)]
pub struct MemoryStorage {
    pub objects: Mutex<HashMap<String, (Vec<u8>, Option<String>)>>,
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: Option<&str>) -> Result<(), StorageError> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data, content_type.map(str::to_string)));
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct Data {
    pub users: HashMap<Uuid, String>,
    pub sessions: HashMap<String, Uuid>,
    pub user_schools: HashSet<(Uuid, Uuid)>,
    pub school_curriculum: HashMap<Uuid, Uuid>,
    pub students: HashMap<Uuid, Student>,
    pub guardians: HashMap<Uuid, Guardian>,
    pub guardian_relations: HashMap<(Uuid, Uuid), GuardianRelationship>,
    pub classes: HashMap<Uuid, Class>,
    pub class_links: HashSet<(Uuid, Uuid)>,
    pub attendances: Vec<Attendance>,
    pub observations: Vec<Observation>,
    pub images: Vec<(Uuid, Image)>,
    pub videos: Vec<(Uuid, Video)>,
    pub plans: Vec<(Vec<Uuid>, LessonPlan)>,
    pub curriculums: HashMap<Uuid, (String, String)>,
    pub areas: HashMap<Uuid, Area>,
    pub subjects: HashMap<Uuid, Subject>,
    pub materials: HashMap<Uuid, Material>,
    pub progress: HashMap<(Uuid, Uuid), (i32, DateTime<Utc>)>,
}

pub struct MemoryStore {
    pub data: Mutex<Data>,
    pub storage: Arc<MemoryStorage>,
    /// When set, every store call fails.
    pub broken: Mutex<bool>,
    /// When set, image rows fail to commit after the upload.
    pub failing_image_commit: Mutex<bool>,
}

impl MemoryStore {
    fn check(&self) -> Result<(), StoreError> {
        if *self.broken.lock().unwrap() {
            return Err(StoreError::Invalid("store unavailable".into()));
        }
        Ok(())
    }

    fn school_users_of_curriculum(data: &Data, curriculum_id: Uuid, user_id: Uuid) -> bool {
        data.school_curriculum
            .iter()
            .any(|(school, c)| *c == curriculum_id && data.user_schools.contains(&(*school, user_id)))
    }

    fn student_curriculum(data: &Data, student_id: Uuid) -> Option<Uuid> {
        let school = data.students.get(&student_id)?.school_id;
        data.school_curriculum.get(&school).copied()
    }

    fn material_curriculum(data: &Data, material_id: Uuid) -> Option<Uuid> {
        let material = data.materials.get(&material_id)?;
        let subject = data.subjects.get(&material.subject_id)?;
        Some(data.areas.get(&subject.area_id)?.curriculum_id)
    }

    fn image_school(data: &Data, image_id: Uuid) -> Option<Uuid> {
        let (owner, _) = data.images.iter().find(|(_, i)| i.id == image_id)?;
        Some(data.students.get(owner)?.school_id)
    }

    fn progress_view(data: &Data, student_id: Uuid, material_id: Uuid) -> Option<MaterialProgress> {
        let (stage, updated_at) = *data.progress.get(&(student_id, material_id))?;
        let material = data.materials.get(&material_id)?;
        let subject = data.subjects.get(&material.subject_id)?;
        Some(MaterialProgress {
            student_id,
            material_id,
            material_name: material.name.clone(),
            area_id: subject.area_id,
            stage,
            updated_at,
        })
    }

    fn sorted_materials(data: &Data, subject_id: Uuid) -> Vec<Material> {
        let mut materials: Vec<Material> = data
            .materials
            .values()
            .filter(|m| m.subject_id == subject_id)
            .cloned()
            .collect();
        materials.sort_by(|a, b| (a.order, &a.name, a.id).cmp(&(b.order, &b.name, b.id)));
        materials
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn find_session(&self, token: &str) -> Result<Option<Session>, StoreError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        Ok(data.sessions.get(token).map(|user_id| Session {
            token: token.to_string(),
            user_id: *user_id,
        }))
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }
}

#[async_trait]
impl StudentStore for MemoryStore {
    async fn insert_observation(&self, o: NewObservation) -> Result<Observation, StoreError> {
        self.check()?;
        let mut data = self.data.lock().unwrap();
        let curriculum = Self::student_curriculum(&data, o.student_id);
        if let Some(area_id) = o.area_id {
            let area_curriculum = data.areas.get(&area_id).map(|a| a.curriculum_id);
            if area_curriculum.is_none() || area_curriculum != curriculum {
                return Err(StoreError::NotFound("area".into()));
            }
        }
        let school = data.students.get(&o.student_id).map(|s| s.school_id);
        if o.images.iter().any(|id| Self::image_school(&data, *id) != school) {
            return Err(StoreError::NotFound("image".into()));
        }
        let student_name = data
            .students
            .get(&o.student_id)
            .map(|s| s.name.clone())
            .ok_or_else(|| StoreError::Invalid("no student".into()))?;
        let images = data
            .images
            .iter()
            .filter(|(_, i)| o.images.contains(&i.id))
            .map(|(_, i)| i.clone())
            .collect();
        let observation = Observation {
            id: Uuid::new_v4(),
            student_id: o.student_id,
            student_name,
            category_id: o.category_id,
            short_desc: o.short_desc,
            long_desc: o.long_desc,
            created_date: Utc::now(),
            event_time: o.event_time,
            creator: data.users.get(&o.creator_id).map(|name| NamedRef {
                id: o.creator_id,
                name: name.clone(),
            }),
            area: o.area_id.and_then(|id| {
                data.areas.get(&id).map(|a| NamedRef {
                    id,
                    name: a.name.clone(),
                })
            }),
            images,
            visible_to_guardians: o.visible_to_guardians,
        };
        data.observations.push(observation.clone());
        Ok(observation)
    }

    async fn get_observations(&self, student_id: Uuid, filter: &ObservationFilter) -> Result<Vec<Observation>, StoreError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        let needle = filter.search.as_deref().map(str::to_lowercase).filter(|s| !s.is_empty());
        let mut list: Vec<Observation> = data
            .observations
            .iter()
            .filter(|o| o.student_id == student_id)
            .filter(|o| match &needle {
                Some(n) => o.short_desc.to_lowercase().contains(n) || o.long_desc.to_lowercase().contains(n),
                None => true,
            })
            .filter(|o| filter.start_date.map_or(true, |t| o.event_time >= t))
            .filter(|o| filter.end_date.map_or(true, |t| o.event_time <= t))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.event_time.cmp(&a.event_time));
        Ok(list)
    }

    async fn get_progress(&self, student_id: Uuid) -> Result<Vec<MaterialProgress>, StoreError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        Ok(data
            .progress
            .keys()
            .filter(|(s, _)| *s == student_id)
            .filter_map(|(s, m)| Self::progress_view(&data, *s, *m))
            .collect())
    }

    async fn update_progress(&self, p: ProgressUpdate) -> Result<MaterialProgress, StoreError> {
        self.check()?;
        let mut data = self.data.lock().unwrap();
        let curriculum = Self::student_curriculum(&data, p.student_id);
        if curriculum.is_none() || Self::material_curriculum(&data, p.material_id) != curriculum {
            return Err(StoreError::NotFound("material".into()));
        }
        data.progress.insert((p.student_id, p.material_id), (p.stage, p.updated_at));
        Self::progress_view(&data, p.student_id, p.material_id).ok_or_else(|| StoreError::Invalid("no material".into()))
    }

    async fn get(&self, student_id: Uuid) -> Result<Option<StudentDetails>, StoreError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        let Some(student) = data.students.get(&student_id).cloned() else {
            return Ok(None);
        };
        let guardians = data
            .guardian_relations
            .keys()
            .filter(|(s, _)| *s == student_id)
            .filter_map(|(_, g)| data.guardians.get(g).cloned())
            .collect();
        let classes = data
            .class_links
            .iter()
            .filter(|(s, _)| *s == student_id)
            .filter_map(|(_, c)| data.classes.get(c).cloned())
            .collect();
        let profile_image = student
            .profile_image_id
            .and_then(|id| data.images.iter().find(|(_, i)| i.id == id).map(|(_, i)| i.clone()));
        Ok(Some(StudentDetails {
            student,
            guardians,
            classes,
            profile_image,
        }))
    }

    async fn update_student(&self, student: &Student) -> Result<(), StoreError> {
        self.check()?;
        self.data.lock().unwrap().students.insert(student.id, student.clone());
        Ok(())
    }

    async fn delete_student(&self, student_id: Uuid) -> Result<(), StoreError> {
        self.check()?;
        self.data.lock().unwrap().students.remove(&student_id);
        Ok(())
    }

    async fn check_permissions(&self, student_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        Ok(data
            .students
            .get(&student_id)
            .map_or(false, |s| data.user_schools.contains(&(s.school_id, user_id))))
    }

    async fn insert_attendance(&self, student_id: Uuid, class_id: Uuid, date: DateTime<Utc>) -> Result<Attendance, StoreError> {
        self.check()?;
        let attendance = Attendance {
            id: Uuid::new_v4(),
            student_id,
            class_id,
            date,
        };
        self.data.lock().unwrap().attendances.push(attendance.clone());
        Ok(attendance)
    }

    async fn get_attendance(&self, student_id: Uuid) -> Result<Vec<Attendance>, StoreError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        Ok(data.attendances.iter().filter(|a| a.student_id == student_id).cloned().collect())
    }

    async fn insert_guardian_relation(
        &self,
        student_id: Uuid,
        guardian_id: Uuid,
        relationship: GuardianRelationship,
    ) -> Result<(), StoreError> {
        self.check()?;
        let mut data = self.data.lock().unwrap();
        if data.guardian_relations.contains_key(&(student_id, guardian_id)) {
            return Err(StoreError::Invalid("duplicate guardian relation".into()));
        }
        data.guardian_relations.insert((student_id, guardian_id), relationship);
        Ok(())
    }

    async fn delete_guardian_relation(&self, student_id: Uuid, guardian_id: Uuid) -> Result<(), StoreError> {
        self.check()?;
        self.data.lock().unwrap().guardian_relations.remove(&(student_id, guardian_id));
        Ok(())
    }

    async fn get_guardian_relation(&self, student_id: Uuid, guardian_id: Uuid) -> Result<Option<GuardianToStudent>, StoreError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        Ok(data
            .guardian_relations
            .get(&(student_id, guardian_id))
            .map(|relationship| GuardianToStudent {
                student_id,
                guardian_id,
                relationship: *relationship,
            }))
    }

    async fn new_class_relation(&self, student_id: Uuid, class_id: Uuid) -> Result<(), StoreError> {
        self.check()?;
        self.data.lock().unwrap().class_links.insert((student_id, class_id));
        Ok(())
    }

    async fn delete_class_relation(&self, student_id: Uuid, class_id: Uuid) -> Result<(), StoreError> {
        self.check()?;
        self.data.lock().unwrap().class_links.remove(&(student_id, class_id));
        Ok(())
    }

    async fn get_lesson_plans(&self, student_id: Uuid, date: DateTime<Utc>) -> Result<Vec<LessonPlan>, StoreError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        let end = date + Duration::days(1);
        Ok(data
            .plans
            .iter()
            .filter(|(students, plan)| students.contains(&student_id) && plan.date >= date && plan.date < end)
            .map(|(_, plan)| plan.clone())
            .collect())
    }

    async fn create_image(&self, student_id: Uuid, upload: ImageUpload) -> Result<Image, StoreError> {
        self.check()?;
        let school_id = self
            .data
            .lock()
            .unwrap()
            .students
            .get(&student_id)
            .map(|s| s.school_id)
            .ok_or_else(|| StoreError::Invalid("no student".into()))?;
        let id = Uuid::new_v4();
        let object_key = image_object_key(school_id, id, upload.file_name.as_deref());
        let image = Image {
            id,
            object_key: object_key.clone(),
            created_at: Utc::now(),
        };
        let commit = async {
            if *self.failing_image_commit.lock().unwrap() {
                return Err(StoreError::Invalid("commit failed".into()));
            }
            self.data.lock().unwrap().images.push((student_id, image.clone()));
            Ok(())
        };
        put_then_commit(
            self.storage.as_ref(),
            &object_key,
            upload.data,
            upload.content_type.as_deref(),
            commit,
        )
        .await?;
        Ok(image)
    }

    async fn find_student_images(&self, student_id: Uuid) -> Result<Vec<Image>, StoreError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        Ok(data.images.iter().filter(|(s, _)| *s == student_id).map(|(_, i)| i.clone()).collect())
    }

    async fn find_student_videos(&self, student_id: Uuid) -> Result<Vec<Video>, StoreError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        Ok(data.videos.iter().filter(|(s, _)| *s == student_id).map(|(_, v)| v.clone()).collect())
    }

    async fn find_curriculum(&self, student_id: Uuid) -> Result<Curriculum, StoreError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        let curriculum_id = data
            .students
            .get(&student_id)
            .and_then(|s| data.school_curriculum.get(&s.school_id));
        let Some(curriculum_id) = curriculum_id.copied() else {
            return Ok(Curriculum::default());
        };
        let Some((name, description)) = data.curriculums.get(&curriculum_id).cloned() else {
            return Ok(Curriculum::default());
        };
        let areas: Vec<Area> = data.areas.values().filter(|a| a.curriculum_id == curriculum_id).cloned().collect();
        let area_ids: HashSet<Uuid> = areas.iter().map(|a| a.id).collect();
        let subjects: Vec<Subject> = data.subjects.values().filter(|s| area_ids.contains(&s.area_id)).cloned().collect();
        let subject_ids: HashSet<Uuid> = subjects.iter().map(|s| s.id).collect();
        let materials = data
            .materials
            .values()
            .filter(|m| subject_ids.contains(&m.subject_id))
            .cloned()
            .collect();
        Ok(nest_curriculum(curriculum_id, name, description, areas, subjects, materials))
    }
}

#[async_trait]
impl CurriculumStore for MemoryStore {
    async fn get_area(&self, area_id: Uuid) -> Result<Option<Area>, StoreError> {
        self.check()?;
        Ok(self.data.lock().unwrap().areas.get(&area_id).cloned())
    }

    async fn get_area_subjects(&self, area_id: Uuid) -> Result<Vec<Subject>, StoreError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        let mut subjects: Vec<Subject> = data.subjects.values().filter(|s| s.area_id == area_id).cloned().collect();
        subjects.sort_by(|a, b| (a.order, &a.name, a.id).cmp(&(b.order, &b.name, b.id)));
        Ok(subjects)
    }

    async fn get_subject_materials(&self, subject_id: Uuid) -> Result<Vec<Material>, StoreError> {
        self.check()?;
        Ok(Self::sorted_materials(&self.data.lock().unwrap(), subject_id))
    }

    async fn get_material(&self, material_id: Uuid) -> Result<Option<Material>, StoreError> {
        self.check()?;
        Ok(self.data.lock().unwrap().materials.get(&material_id).cloned())
    }

    async fn new_area(&self, curriculum_id: Uuid, name: &str, description: &str) -> Result<Area, StoreError> {
        self.check()?;
        let area = Area {
            id: Uuid::new_v4(),
            curriculum_id,
            name: name.to_string(),
            description: description.to_string(),
            subjects: Vec::new(),
        };
        self.data.lock().unwrap().areas.insert(area.id, area.clone());
        Ok(area)
    }

    async fn new_subject(
        &self,
        area_id: Uuid,
        name: &str,
        materials: &[SubjectMaterial],
        description: &str,
    ) -> Result<Subject, StoreError> {
        self.check()?;
        let mut data = self.data.lock().unwrap();
        let order = data
            .subjects
            .values()
            .filter(|s| s.area_id == area_id)
            .map(|s| s.order + 1)
            .max()
            .unwrap_or(0);
        let mut subject = Subject {
            id: Uuid::new_v4(),
            area_id,
            name: name.to_string(),
            order,
            description: description.to_string(),
            materials: Vec::new(),
        };
        for m in materials {
            let material = Material {
                id: Uuid::new_v4(),
                subject_id: subject.id,
                name: m.name.clone(),
                order: m.order,
                description: m.description.clone(),
            };
            data.materials.insert(material.id, material.clone());
            subject.materials.push(material);
        }
        let mut stored = subject.clone();
        stored.materials.clear();
        data.subjects.insert(subject.id, stored);
        Ok(subject)
    }

    async fn new_material(&self, subject_id: Uuid, name: &str, description: &str) -> Result<Material, StoreError> {
        self.check()?;
        let mut data = self.data.lock().unwrap();
        let order = data
            .materials
            .values()
            .filter(|m| m.subject_id == subject_id)
            .map(|m| m.order + 1)
            .max()
            .unwrap_or(0);
        let material = Material {
            id: Uuid::new_v4(),
            subject_id,
            name: name.to_string(),
            order,
            description: description.to_string(),
        };
        data.materials.insert(material.id, material.clone());
        Ok(material)
    }

    async fn get_subject(&self, subject_id: Uuid) -> Result<Option<Subject>, StoreError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        Ok(data.subjects.get(&subject_id).cloned().map(|mut s| {
            s.materials = Self::sorted_materials(&data, subject_id);
            s
        }))
    }

    async fn update_material(&self, material_id: Uuid, u: &MaterialUpdate) -> Result<(), StoreError> {
        self.check()?;
        let mut data = self.data.lock().unwrap();
        if let Some(m) = data.materials.get_mut(&material_id) {
            if let Some(name) = &u.name {
                m.name = name.clone();
            }
            if let Some(order) = u.order {
                m.order = order;
            }
            if let Some(description) = &u.description {
                m.description = description.clone();
            }
            if let Some(subject_id) = u.subject_id {
                m.subject_id = subject_id;
            }
        }
        Ok(())
    }

    async fn delete_area(&self, area_id: Uuid) -> Result<(), StoreError> {
        self.check()?;
        let mut data = self.data.lock().unwrap();
        data.areas.remove(&area_id);
        let subjects: Vec<Uuid> = data.subjects.values().filter(|s| s.area_id == area_id).map(|s| s.id).collect();
        for id in subjects {
            data.subjects.remove(&id);
            data.materials.retain(|_, m| m.subject_id != id);
        }
        Ok(())
    }

    async fn delete_subject(&self, subject_id: Uuid) -> Result<(), StoreError> {
        self.check()?;
        let mut data = self.data.lock().unwrap();
        data.subjects.remove(&subject_id);
        data.materials.retain(|_, m| m.subject_id != subject_id);
        Ok(())
    }

    async fn replace_subject(
        &self,
        subject_id: Uuid,
        name: &str,
        area_id: Uuid,
        order: i32,
        materials: &[SubjectMaterial],
    ) -> Result<Subject, StoreError> {
        self.check()?;
        let mut data = self.data.lock().unwrap();
        let foreign = materials
            .iter()
            .filter_map(|m| m.id)
            .any(|id| data.materials.get(&id).map(|m| m.subject_id) != Some(subject_id));
        if foreign {
            return Err(StoreError::NotFound("material".into()));
        }
        let subject = data
            .subjects
            .get_mut(&subject_id)
            .ok_or_else(|| StoreError::Invalid("no subject".into()))?;
        subject.name = name.to_string();
        subject.area_id = area_id;
        subject.order = order;
        let kept: HashSet<Uuid> = materials.iter().filter_map(|m| m.id).collect();
        data.materials.retain(|id, m| m.subject_id != subject_id || kept.contains(id));
        for m in materials {
            let material = Material {
                id: m.id.unwrap_or_else(Uuid::new_v4),
                subject_id,
                name: m.name.clone(),
                order: m.order,
                description: m.description.clone(),
            };
            data.materials.insert(material.id, material);
        }
        let mut subject = data.subjects[&subject_id].clone();
        subject.materials = Self::sorted_materials(&data, subject_id);
        Ok(subject)
    }

    async fn update_area(&self, area_id: Uuid, name: &str) -> Result<(), StoreError> {
        self.check()?;
        if let Some(area) = self.data.lock().unwrap().areas.get_mut(&area_id) {
            area.name = name.to_string();
        }
        Ok(())
    }

    async fn check_subject_permissions(&self, subject_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        Ok(data
            .subjects
            .get(&subject_id)
            .and_then(|s| data.areas.get(&s.area_id))
            .map_or(false, |a| Self::school_users_of_curriculum(&data, a.curriculum_id, user_id)))
    }

    async fn check_area_permissions(&self, area_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        Ok(data
            .areas
            .get(&area_id)
            .map_or(false, |a| Self::school_users_of_curriculum(&data, a.curriculum_id, user_id)))
    }

    async fn check_curriculum_permission(&self, curriculum_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        Ok(Self::school_users_of_curriculum(&data, curriculum_id, user_id))
    }

    async fn check_material_permission(&self, material_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        Ok(data
            .materials
            .get(&material_id)
            .and_then(|m| data.subjects.get(&m.subject_id))
            .and_then(|s| data.areas.get(&s.area_id))
            .map_or(false, |a| Self::school_users_of_curriculum(&data, a.curriculum_id, user_id)))
    }

    async fn update_curriculum(&self, curriculum_id: Uuid, u: &CurriculumUpdate) -> Result<Option<Curriculum>, StoreError> {
        self.check()?;
        let mut data = self.data.lock().unwrap();
        Ok(data.curriculums.get_mut(&curriculum_id).map(|(name, description)| {
            if let Some(n) = &u.name {
                *name = n.clone();
            }
            if let Some(d) = &u.description {
                *description = d.clone();
            }
            Curriculum {
                id: curriculum_id,
                name: name.clone(),
                description: description.clone(),
                areas: Vec::new(),
            }
        }))
    }

    async fn update_subject(&self, subject_id: Uuid, u: &SubjectUpdate) -> Result<Option<Subject>, StoreError> {
        self.check()?;
        let mut data = self.data.lock().unwrap();
        Ok(data.subjects.get_mut(&subject_id).map(|s| {
            if let Some(name) = &u.name {
                s.name = name.clone();
            }
            if let Some(order) = u.order {
                s.order = order;
            }
            if let Some(description) = &u.description {
                s.description = description.clone();
            }
            if let Some(area_id) = u.area_id {
                s.area_id = area_id;
            }
            s.clone()
        }))
    }

    async fn delete_material(&self, material_id: Uuid) -> Result<(), StoreError> {
        self.check()?;
        self.data.lock().unwrap().materials.remove(&material_id);
        Ok(())
    }
}

/// Ids of the seeded records.
#[derive(Clone, Copy, Debug)]
pub struct Seed {
    pub user: Uuid,
    pub outsider: Uuid,
    pub school: Uuid,
    pub other_school: Uuid,
    pub student: Uuid,
    pub other_student: Uuid,
    pub guardian: Uuid,
    pub class: Uuid,
    pub curriculum: Uuid,
    pub other_curriculum: Uuid,
    pub area: Uuid,
    pub subject: Uuid,
    pub materials: [Uuid; 3],
    pub other_area: Uuid,
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub storage: Arc<MemoryStorage>,
    pub seed: Seed,
    pub router: Router,
}

/// Seeded store: one staff member at a school with one student, a guardian, a class and a
/// three-material curriculum; an outsider at another school with its own curriculum.
pub fn seeded_store() -> (MemoryStore, Arc<MemoryStorage>, Seed) {
    let seed = Seed {
        user: Uuid::new_v4(),
        outsider: Uuid::new_v4(),
        school: Uuid::new_v4(),
        other_school: Uuid::new_v4(),
        student: Uuid::new_v4(),
        other_student: Uuid::new_v4(),
        guardian: Uuid::new_v4(),
        class: Uuid::new_v4(),
        curriculum: Uuid::new_v4(),
        other_curriculum: Uuid::new_v4(),
        area: Uuid::new_v4(),
        subject: Uuid::new_v4(),
        materials: [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()],
        other_area: Uuid::new_v4(),
    };
    let mut data = Data::default();
    data.users.insert(seed.user, "Maria".into());
    data.users.insert(seed.outsider, "Olga".into());
    data.sessions.insert(SESSION_TOKEN.into(), seed.user);
    data.sessions.insert(OUTSIDER_TOKEN.into(), seed.outsider);
    data.user_schools.insert((seed.school, seed.user));
    data.user_schools.insert((seed.other_school, seed.outsider));
    data.school_curriculum.insert(seed.school, seed.curriculum);
    data.school_curriculum.insert(seed.other_school, seed.other_curriculum);

    for (id, school, name) in [(seed.student, seed.school, "Ada"), (seed.other_student, seed.other_school, "Bo")] {
        data.students.insert(
            id,
            Student {
                id,
                school_id: school,
                name: name.into(),
                custom_id: "C-1".into(),
                date_of_birth: Some("2019-05-04T00:00:00Z".parse().unwrap()),
                date_of_entry: None,
                gender: Gender::Female,
                note: String::new(),
                active: true,
                profile_image_id: None,
            },
        );
    }
    data.guardians.insert(
        seed.guardian,
        Guardian {
            id: seed.guardian,
            name: "Grace".into(),
            email: "grace@example.com".into(),
        },
    );
    data.guardian_relations
        .insert((seed.student, seed.guardian), GuardianRelationship::Mother);
    data.classes.insert(
        seed.class,
        Class {
            id: seed.class,
            name: "Sunflower".into(),
        },
    );
    data.class_links.insert((seed.student, seed.class));

    data.curriculums.insert(seed.curriculum, ("Montessori".into(), String::new()));
    data.curriculums.insert(seed.other_curriculum, ("Other".into(), String::new()));
    data.areas.insert(
        seed.area,
        Area {
            id: seed.area,
            curriculum_id: seed.curriculum,
            name: "Math".into(),
            description: String::new(),
            subjects: Vec::new(),
        },
    );
    data.areas.insert(
        seed.other_area,
        Area {
            id: seed.other_area,
            curriculum_id: seed.other_curriculum,
            name: "Other math".into(),
            description: String::new(),
            subjects: Vec::new(),
        },
    );
    data.subjects.insert(
        seed.subject,
        Subject {
            id: seed.subject,
            area_id: seed.area,
            name: "Counting".into(),
            order: 0,
            description: String::new(),
            materials: Vec::new(),
        },
    );
    for (i, (id, name)) in seed.materials.iter().zip(["Rods", "Beads", "Cards"]).enumerate() {
        data.materials.insert(
            *id,
            Material {
                id: *id,
                subject_id: seed.subject,
                name: name.into(),
                order: i as i32,
                description: String::new(),
            },
        );
    }

    let storage = Arc::new(MemoryStorage::default());
    let store = MemoryStore {
        data: Mutex::new(data),
        storage: storage.clone(),
        broken: Mutex::new(false),
        failing_image_commit: Mutex::new(false),
    };
    (store, storage, seed)
}

pub fn imgproxy() -> ImgProxy {
    ImgProxy::new("http://img.test", "6b6579", "73616c74", "media").unwrap()
}

pub fn state_for(store: Arc<MemoryStore>, upload_limit: usize) -> AppState {
    AppState {
        students: store.clone(),
        curriculum: store.clone(),
        sessions: store.clone(),
        health: store,
        imgproxy: Arc::new(imgproxy()),
        upload_limit,
    }
}

pub fn test_app() -> TestApp {
    test_app_with(None)
}

pub fn test_app_with(frontend_dir: Option<PathBuf>) -> TestApp {
    let (store, storage, seed) = seeded_store();
    let store = Arc::new(store);
    let router = app(state_for(store.clone(), 10 * 1024 * 1024), frontend_dir);
    TestApp {
        store,
        storage,
        seed,
        router,
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("session={}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    /// Authenticated as the seeded staff member.
    pub async fn call(&self, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response<Body> {
        self.send(request(method, uri, Some(SESSION_TOKEN), body)).await
    }

    pub fn student_uri(&self, rest: &str) -> String {
        format!("/api/v1/students/{}{}", self.seed.student, rest)
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
