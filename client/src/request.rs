use common::yarn::{
    AM_VCORES, APPLICATION_TYPE, DEFAULT_PRIORITY, DEFAULT_QUEUE, JOB_RESOURCE_KEY,
};
use common::{
    AmContainerSpec, Commands, JobSubmission, LocalResource, LocalResourceEntry, LocalResources,
    Resource, ResourceType, SubmitApplication, Visibility,
};

use crate::uploader::JobResource;

/// Arma el descriptor de envío para el RM. Sin E/S ni estado.
///
/// Cola, prioridad, vcores y tipo de aplicación son fijos; el RM los espera así.
pub fn build_submit_application(
    job: &JobSubmission,
    application_id: &str,
    max_application_submissions: u32,
    resource: &JobResource,
    command: String,
) -> SubmitApplication {
    SubmitApplication {
        application_id: application_id.to_string(),
        application_name: job.job_identifier().to_string(),
        queue: DEFAULT_QUEUE.to_string(),
        priority: DEFAULT_PRIORITY,
        am_container_spec: AmContainerSpec {
            local_resources: LocalResources {
                entries: vec![LocalResourceEntry {
                    key: JOB_RESOURCE_KEY.to_string(),
                    value: LocalResource {
                        resource: resource.remote_upload_path.clone(),
                        resource_type: ResourceType::Archive,
                        visibility: Visibility::Application,
                        size: resource.resource_size,
                        timestamp: resource.last_modification_unix_timestamp,
                    },
                }],
            },
            commands: Commands { command },
        },
        unmanaged_am: false,
        max_app_attempts: max_application_submissions,
        am_resource: Resource {
            memory_mb: job.driver_memory_mb(),
            vcores: AM_VCORES,
        },
        application_type: APPLICATION_TYPE.to_string(),
        keep_containers_across_application_attempts: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource() -> JobResource {
        JobResource {
            remote_upload_path: "/remote/app_001".to_string(),
            resource_size: 2048,
            last_modification_unix_timestamp: 1234567890,
        }
    }

    #[test]
    fn descriptor_del_escenario_basico() {
        let job = JobSubmission::builder()
            .job_identifier("job1")
            .driver_memory_mb(512)
            .build()
            .unwrap();

        let req = build_submit_application(&job, "app_001", 2, &resource(), "cmd".to_string());

        assert_eq!(req.application_id, "app_001");
        assert_eq!(req.application_name, "job1");
        assert_eq!(req.am_resource, Resource { memory_mb: 512, vcores: 1 });
        assert_eq!(req.max_app_attempts, 2);
        assert_eq!(req.queue, "default");
        assert_eq!(req.priority, 1);
        assert_eq!(req.application_type, "REEF");
        assert!(!req.unmanaged_am);
        assert!(req.keep_containers_across_application_attempts);
        assert_eq!(req.am_container_spec.commands.command, "cmd");

        let entries = &req.am_container_spec.local_resources.entries;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "reef");
        assert_eq!(
            entries[0].value,
            LocalResource {
                resource: "/remote/app_001".to_string(),
                resource_type: ResourceType::Archive,
                visibility: Visibility::Application,
                size: 2048,
                timestamp: 1234567890,
            }
        );
    }

    #[test]
    fn constantes_no_dependen_del_tamano_del_job() {
        for memory in [1, 512, 65536] {
            let job = JobSubmission::builder()
                .job_identifier("grande")
                .driver_memory_mb(memory)
                .add_global_file("/a.jar")
                .add_global_file("/b.jar")
                .add_local_file("/c.conf")
                .build()
                .unwrap();

            let req = build_submit_application(&job, "app_9", 7, &resource(), String::new());

            assert_eq!(req.am_resource.memory_mb, memory);
            assert_eq!(req.am_resource.vcores, 1);
            assert!(!req.unmanaged_am);
            assert_eq!(req.application_type, APPLICATION_TYPE);
            assert_eq!(req.am_container_spec.local_resources.entries.len(), 1);
        }
    }
}
