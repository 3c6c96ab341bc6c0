//! Pod manifest template bodies
//!
//! Rendered by [`crate::template::Renderer`] against the parameter records
//! the tool variants build. Every template is strict: referencing a
//! parameter that was not supplied fails at render time.

/// Workload pod for the wrk variant (nginx serving on port 80)
pub const NGINX_POD: &str = r#"apiVersion: v1
kind: Pod
metadata:
  name: {{ name }}
  namespace: {{ namespace }}
  labels:
    app: {{ name }}
    app.kubernetes.io/managed-by: capstan
    capstan.io/role: workload
    capstan.io/case: {{ case }}
spec:
  containers:
    - name: workload
      image: {{ image }}
      ports:
        - containerPort: 80
"#;

/// Testing pod for the wrk variant
///
/// The `affinity` flag selects same-node (pod affinity) or different-node
/// (pod anti-affinity) placement relative to the workload pod.
pub const WRK_POD: &str = r#"apiVersion: v1
kind: Pod
metadata:
  name: {{ name }}
  namespace: {{ namespace }}
  labels:
    app.kubernetes.io/managed-by: capstan
    capstan.io/role: testing
    capstan.io/case: {{ case }}
spec:
  restartPolicy: Never
  affinity:
{%- if affinity %}
    podAffinity:
      requiredDuringSchedulingIgnoredDuringExecution:
        - labelSelector:
            matchLabels:
              app: {{ workload }}
          topologyKey: kubernetes.io/hostname
{%- else %}
    podAntiAffinity:
      requiredDuringSchedulingIgnoredDuringExecution:
        - labelSelector:
            matchLabels:
              app: {{ workload }}
          topologyKey: kubernetes.io/hostname
{%- endif %}
  containers:
    - name: {{ tool }}
      image: {{ image }}
      command: ["/bin/sh", "-c"]
      args:
        - {{ command | tojson }}
"#;

/// Workload pod for the scripted variant (image provided by configuration)
pub const SCRIPTED_WORKLOAD_POD: &str = r#"apiVersion: v1
kind: Pod
metadata:
  name: {{ name }}
  namespace: {{ namespace }}
  labels:
    app: {{ name }}
    app.kubernetes.io/managed-by: capstan
    capstan.io/role: workload
    capstan.io/case: {{ case }}
spec:
  containers:
    - name: workload
      image: {{ image }}
"#;

/// Testing pod for the scripted variant
///
/// Mounts the script config map at /capstan and imports the env config map;
/// the workload pod's IP is handed to the script as WORKLOAD_HOST. The
/// script is responsible for printing the completion sentinel.
pub const SCRIPTED_TESTING_POD: &str = r#"apiVersion: v1
kind: Pod
metadata:
  name: {{ name }}
  namespace: {{ namespace }}
  labels:
    app.kubernetes.io/managed-by: capstan
    capstan.io/role: testing
    capstan.io/case: {{ case }}
spec:
  restartPolicy: Never
  containers:
    - name: {{ tool }}
      image: {{ image }}
      command: ["/bin/sh", "/capstan/script.sh"]
      env:
        - name: WORKLOAD_HOST
          value: "{{ pod_ip }}"
      envFrom:
        - configMapRef:
            name: {{ envs_config_map }}
      volumeMounts:
        - name: script
          mountPath: /capstan
  volumes:
    - name: script
      configMap:
        name: {{ script_config_map }}
"#;
